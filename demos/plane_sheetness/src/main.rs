use argh::FromArgs;
use std::path::PathBuf;

use sheetness::imgproc::{
    self,
    broadcast::broadcast_binary_filter,
    functor::{KrcahNotBackground, SheetPolarity},
    statistics::statistics,
    ExecutionStrategy, NoiseNormalization, SheetnessConfig, SheetnessFeatureGenerator,
    SheetnessMethod, TraceReference,
};
use sheetness::volume::{Volume, VolumeGeometry, VolumeSize};

#[derive(FromArgs)]
/// Compute the sheetness of a synthetic plane phantom
struct Args {
    /// side of the cubic phantom in voxels
    #[argh(option, short = 's', default = "32")]
    size: usize,

    /// intensity of the plane
    #[argh(option, default = "1000")]
    plane_value: i16,

    /// intensity of the background
    #[argh(option, default = "0")]
    background_value: i16,

    /// voxel spacing along z
    #[argh(option, default = "1.0")]
    z_spacing: f64,

    /// sheetness method: krcah, krcah-slice, descoteaux, femur or modified
    #[argh(option, short = 'm', default = "String::from(\"modified\")")]
    method: String,

    /// hessian scale, may be repeated
    #[argh(option)]
    sigma: Vec<f64>,

    /// fraction of the maximum eigenvalue norm used as noise constant
    #[argh(option, default = "0.05")]
    noise_scale: f64,

    /// detect dark sheets instead of bright ones
    #[argh(switch)]
    dark: bool,

    /// number of worker threads, 0 picks automatically
    #[argh(option, short = 't', default = "0")]
    threads: usize,

    /// optional JSON file with a full configuration
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
}

fn method_from_name(name: &str, noise_scale: f64) -> Result<SheetnessMethod, String> {
    let noise = NoiseNormalization::Automatic {
        scale: noise_scale,
        label: 1,
    };
    let method = match name {
        "krcah" => SheetnessMethod::default(),
        "krcah-slice" => SheetnessMethod::Krcah {
            alpha: 0.5,
            beta: 0.5,
            gamma: 0.25,
            reference: TraceReference::PerSlice,
        },
        "descoteaux" => SheetnessMethod::Descoteaux {
            alpha: 0.5,
            beta: 0.5,
            noise,
        },
        "femur" => SheetnessMethod::Femur {
            alpha: 0.5,
            beta: 0.5,
            gamma: 0.25,
        },
        "modified" => SheetnessMethod::Modified { alpha: 0.5, noise },
        other => return Err(format!("unknown sheetness method: {other}")),
    };
    Ok(method)
}

#[cfg(feature = "serde")]
fn load_config(path: &PathBuf) -> Result<SheetnessConfig, Box<dyn std::error::Error>> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

#[cfg(not(feature = "serde"))]
fn load_config(_path: &PathBuf) -> Result<SheetnessConfig, Box<dyn std::error::Error>> {
    Err("reading a configuration file requires the `serde` feature".into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let strategy = match args.threads {
                0 => ExecutionStrategy::Auto,
                n => ExecutionStrategy::Fixed(n),
            };
            let polarity = if args.dark {
                SheetPolarity::Dark
            } else {
                SheetPolarity::Bright
            };
            let mut config = SheetnessConfig::default()
                .with_method(method_from_name(&args.method, args.noise_scale)?)
                .with_polarity(polarity)
                .with_strategy(strategy);
            if !args.sigma.is_empty() {
                config = config.with_sigmas(args.sigma.clone());
            }
            config
        }
    };

    // a single plane across the middle of the phantom
    let plane_z = args.size / 2;
    let size = VolumeSize::new(args.size, args.size, args.size);
    let phantom = Volume::from_fn(size, |[_, _, z]| {
        if z == plane_z {
            args.plane_value
        } else {
            args.background_value
        }
    })
    .with_geometry(VolumeGeometry::with_spacing([1.0, 1.0, args.z_spacing]))?;

    // the plane voxels are the region for automatic noise estimation
    let intensity = phantom.cast::<f64>()?;
    let threshold = (f64::from(args.plane_value) + f64::from(args.background_value)) / 2.0;
    let mut mask = phantom.graft(0u8);
    let (lower, upper) = if args.plane_value >= args.background_value {
        (threshold, f64::MAX)
    } else {
        (f64::MIN, threshold)
    };
    imgproc::threshold::binary_threshold(
        &intensity,
        &mut mask,
        lower,
        upper,
        1,
        0,
        config.strategy,
    )?;

    log::info!(
        "phantom {size}, plane at z = {plane_z}, {} mask voxels, method {:?}",
        mask.as_slice().iter().filter(|&&v| v == 1).count(),
        config.method
    );

    let generator = SheetnessFeatureGenerator::new(config)?;
    let sheetness = generator.generate(&phantom, Some(&mask))?;
    let sheetness = sheetness.map(|&v| f64::from(v));

    let stats = statistics(&sheetness, generator.config().strategy)?;
    println!(
        "sheetness over {} voxels: min {:.4}, max {:.4}, mean {:.4}",
        stats.count, stats.min, stats.max, stats.mean
    );

    let center = args.size / 2;
    println!("profile along z at ({center}, {center}):");
    for z in 0..args.size {
        if let Some(v) = sheetness.get([center, center, z]) {
            println!("  z = {z:3}: {v:+.4}");
        }
    }

    let bone = broadcast_binary_filter(
        &intensity,
        &sheetness,
        &KrcahNotBackground::default(),
        generator.config().strategy,
        None,
    )?;
    let bone_voxels = bone.as_slice().iter().filter(|&&v| v == 1).count();
    println!("voxels above 400 with positive sheetness: {bone_voxels}");
    log::info!("done, {bone_voxels} of {} voxels labelled", bone.num_voxels());

    Ok(())
}
