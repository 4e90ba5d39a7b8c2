use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use glam::Vec3;

use heightmesh::terrain::{load_raster, LightMapBaker, MergeMode, TerrainConfig, TerrainService};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MergeArg {
    Squares,
    Rectangles,
}

impl From<MergeArg> for MergeMode {
    fn from(arg: MergeArg) -> Self {
        match arg {
            MergeArg::Squares => MergeMode::Squares,
            MergeArg::Rectangles => MergeMode::Rectangles,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "heightmesh")]
#[command(about = "Simplify a heightmap into a terrain mesh and bake its light map")]
struct Args {
    /// Heightmap image, or a .txt grid of numbers
    file: String,

    /// World extent along X
    #[arg(long, default_value = "300.0")]
    world_width: f32,

    /// World extent along Z
    #[arg(long, default_value = "300.0")]
    world_height: f32,

    /// Raw intensities are divided by this to get heights
    #[arg(long, default_value = "1.0")]
    scale: f32,

    /// Cell columns (defaults to the raster width)
    #[arg(long)]
    cols: Option<usize>,

    /// Cell rows (defaults to the raster height)
    #[arg(long)]
    rows: Option<usize>,

    /// Floor heights to multiples of this step before merging
    #[arg(long)]
    height_step: Option<f32>,

    /// Cell merging algorithm
    #[arg(long, value_enum, default_value = "squares")]
    merge: MergeArg,

    /// Keep duplicate vertices at quad seams
    #[arg(long)]
    no_weld: bool,

    /// Light position in texel units, as X,Y,Z
    #[arg(long, value_parser = parse_vec3)]
    light: Option<Vec3>,

    /// Write the baked light map to this PNG
    #[arg(long, requires = "light")]
    lightmap_out: Option<String>,

    /// Bake the light map across all cores
    #[arg(long)]
    parallel: bool,

    /// World point to sample, as X,Z (repeatable)
    #[arg(long, value_parser = parse_vec2)]
    probe: Vec<(f32, f32)>,
}

impl Args {
    fn config(&self) -> TerrainConfig {
        TerrainConfig {
            world_width: self.world_width,
            world_height: self.world_height,
            scale: self.scale,
            cols: self.cols,
            rows: self.rows,
            height_step: self.height_step,
            merge: self.merge.into(),
            weld: !self.no_weld,
        }
    }
}

fn parse_floats(s: &str, n: usize) -> Result<Vec<f32>> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("expected {} comma-separated numbers, got '{}'", n, s))?;
    if values.len() != n {
        bail!("expected {} comma-separated numbers, got '{}'", n, s);
    }
    Ok(values)
}

fn parse_vec3(s: &str) -> Result<Vec3> {
    let v = parse_floats(s, 3)?;
    Ok(Vec3::new(v[0], v[1], v[2]))
}

fn parse_vec2(s: &str) -> Result<(f32, f32)> {
    let v = parse_floats(s, 2)?;
    Ok((v[0], v[1]))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Load raster
    let raster = load_raster(&args.file).with_context(|| format!("loading {}", args.file))?;
    println!(
        "Loaded raster: {}x{}, value range: {:?}",
        raster.width,
        raster.height,
        raster.value_bounds()
    );

    // Build terrain
    let terrain = TerrainService::build(&raster, &args.config())?;
    let stats = terrain.stats();
    println!(
        "Generated mesh: {} cells -> {} quads ({:.1}%), {} vertices, {} faces",
        stats.cells,
        stats.quads,
        stats.reduction() * 100.0,
        stats.vertices,
        stats.faces
    );
    println!("Height range: {:?}", terrain.grid().height_bounds());

    for &(x, z) in &args.probe {
        match terrain.height_at(x, z)? {
            Some(h) => {
                let pitch = terrain.angle_at(x, z, 1.0, 0.0)?;
                let roll = terrain.angle_at(x, z, 1.0, std::f32::consts::FRAC_PI_2)?;
                println!(
                    "Probe ({:.2}, {:.2}): height {:.3}, pitch {:.2}°, roll {:.2}°",
                    x,
                    z,
                    h,
                    pitch.to_degrees(),
                    roll.to_degrees()
                );
            }
            None => println!("Probe ({:.2}, {:.2}): outside terrain", x, z),
        }
    }

    if let Some(light) = args.light {
        let baker = LightMapBaker::new(terrain.grid());
        let map = if args.parallel {
            baker.bake_parallel(light)
        } else {
            baker.bake(light)
        };
        println!(
            "Light map: {}x{}, {:.1}% lit",
            map.width,
            map.height,
            map.lit_fraction() * 100.0
        );
        if let Some(path) = &args.lightmap_out {
            map.save_png(path)
                .with_context(|| format!("writing {}", path))?;
            println!("Wrote {}", path);
        }
    }

    Ok(())
}
