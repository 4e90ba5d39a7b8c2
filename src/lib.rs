//! Heightmap terrain simplification, queries and light map baking.
//!
//! ```
//! use heightmesh::terrain::{build_terrain, Raster};
//!
//! let raster = Raster::new(4, 4, vec![10.0; 16]).unwrap();
//! let terrain = build_terrain(40.0, 40.0, &raster, 1.0, 4, 4).unwrap();
//! assert_eq!(terrain.stats().quads, 1);
//! assert_eq!(terrain.height_at(0.0, 0.0).unwrap(), Some(10.0));
//! ```

pub mod terrain;
