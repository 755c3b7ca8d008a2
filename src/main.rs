use anyhow::{bail, Context as AnyhowContext, Result};
use clap::Parser;
use serde::Serialize;
use std::path::Path;

use tracing::info;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{filter::LevelFilter, prelude::*};

use imreg_rust::config::*;
use imreg_rust::dataset::*;
use imreg_rust::image::Image;
use imreg_rust::my_types::*;
use imreg_rust::point_based::ls_affine;
use imreg_rust::registration::GradientAscent;
use imreg_rust::resample::transform_image;
use imreg_rust::similarity::correlation;
use imreg_rust::synthetic::{add_noise, shifted_pair};

#[derive(Parser)]
pub struct Args {
    /// fixed image file
    #[clap(long)]
    pub fixed: Option<String>,
    /// moving image file
    #[clap(long)]
    pub moving: Option<String>,
    /// control point JSON, switches to point based registration
    #[clap(long)]
    pub points: Option<String>,
    /// register a synthetic shifted pair instead of files
    #[clap(long)]
    pub demo: bool,
    #[clap(long, default_value = "8")]
    pub demo_shift: i64,
    /// amplitude of uniform noise added to the demo moving image
    #[clap(long, default_value = "0")]
    pub demo_noise: f64,
    #[clap(short, long)]
    pub verbose: bool,
    #[clap(flatten)]
    pub config: Config,
}

#[derive(Serialize)]
struct Summary {
    mode: String,
    params: Option<Vectord>,
    /// row-major
    transform: [[f64; 3]; 3],
    trajectory: Vec<f64>,
    final_score: Option<f64>,
}

fn rows(th: &Matrix3d) -> [[f64; 3]; 3] {
    let mut out = [[0.; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            out[r][c] = th[(r, c)];
        }
    }
    out
}

fn register_intensity(fixed: &Image, moving: &Image) -> Result<Summary> {
    let config = config();
    let objective = config.objective(fixed, moving)?;
    let num_iter = config.num_iter();
    let ascent = GradientAscent::from_identity(objective, config.learning_rate(), num_iter)?
        .with_gradient_step(config.gradient_step);

    let result = ascent.run()?;

    Ok(Summary {
        mode: config.task.to_string(),
        final_score: result.trajectory.last().copied(),
        transform: rows(&result.transform),
        params: Some(result.params),
        trajectory: result.trajectory,
    })
}

fn register_points(points_path: &Path, args: &Args) -> Result<Summary> {
    let points = load_control_points(points_path)?;
    let (x, xm) = points.to_homogeneous()?;
    let th = ls_affine(&x, &xm).context("least squares affine fit failed")?;
    info!("affine from {} control points", x.ncols());

    // score the fit when both images are available
    let final_score = match (&args.fixed, &args.moving) {
        (Some(fixed), Some(moving)) => {
            let fixed = load_image(Path::new(fixed))?;
            let moving = load_image(Path::new(moving))?;
            let (warped, _) = transform_image(&moving, &th, config().interpolation)?;
            Some(correlation(&fixed, &warped)?)
        }
        _ => None,
    };

    Ok(Summary {
        mode: "point_based".to_string(),
        params: None,
        transform: rows(&th),
        trajectory: vec![],
        final_score,
    })
}

fn main() -> Result<()> {
    // parse the config
    let args = Args::parse();
    let _ = CONFIG.set(args.config.clone());

    // setup logging
    let level = if args.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .with_filter(level),
        )
        .with(indicatif_layer)
        .init();

    let summary = if let Some(points) = &args.points {
        register_points(Path::new(points), &args)?
    } else if args.demo {
        let (fixed, moving) = shifted_pair((64, 64), args.demo_shift);
        let moving = add_noise(&moving, args.demo_noise, config().seed);
        register_intensity(&fixed, &moving)?
    } else {
        let (fixed, moving) = match (&args.fixed, &args.moving) {
            (Some(fixed), Some(moving)) => (
                load_image(Path::new(fixed))?,
                load_image(Path::new(moving))?,
            ),
            _ => bail!("either --fixed and --moving, --points or --demo is required"),
        };
        register_intensity(&fixed, &moving)?
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
