use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use roll_slicer::config::{PlannerConfig, parse_roll_widths};
use roll_slicer::export::{DryRunEditor, EditorCall, grid_tasks, strip_tasks};
use roll_slicer::planner::PlanOutcome;
use roll_slicer::session::Session;
use roll_slicer::types::SourceImage;
use roll_slicer::units::{self, Unit};
use roll_slicer::{render, report};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "roll_slicer",
    about = "Plans how to cut a large image into strips that fit printer rolls"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log planner decisions to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Rank cutting plans for every roll width
    Plan {
        #[command(flatten)]
        image: ImageArgs,
        #[command(flatten)]
        planner: PlannerArgs,
        /// Show the strip widths and an ASCII layout of the chosen plan
        #[arg(long)]
        layout: bool,
        /// Plan number to show with --layout (1 is the best)
        #[arg(long, default_value_t = 1)]
        pick: usize,
    },
    /// Split the image into a fixed grid of overlapping tiles
    Grid {
        #[command(flatten)]
        image: ImageArgs,
        #[command(flatten)]
        planner: PlannerArgs,
        #[arg(long)]
        cols: u32,
        #[arg(long)]
        rows: u32,
        /// Show an ASCII layout of the tiles
        #[arg(long)]
        layout: bool,
    },
    /// Walk through the export of a plan or grid without writing any file
    Export {
        #[command(flatten)]
        image: ImageArgs,
        #[command(flatten)]
        planner: PlannerArgs,
        /// Plan number to export (1 is the best)
        #[arg(long, default_value_t = 1, conflicts_with = "grid")]
        pick: usize,
        /// Export a COLSxROWS grid instead of a plan (e.g. 3x2)
        #[arg(long)]
        grid: Option<String>,
        /// Destination folder for the pieces
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct ImageArgs {
    /// Image size as WxH (e.g. 3000x1000)
    #[arg(long)]
    size: String,

    /// Unit of --size: mm or px
    #[arg(long, default_value = "mm", value_parser = parse_unit)]
    unit: Unit,

    /// Image resolution in dpi
    #[arg(long, default_value_t = 300.0)]
    dpi: f64,

    /// Document name; output files are named after it
    #[arg(long, default_value = "image.tif")]
    name: String,
}

#[derive(Args)]
struct PlannerArgs {
    /// JSON file with overlap, margin and roll_widths
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seam overlap in mm (default: 20)
    #[arg(long)]
    overlap: Option<f64>,

    /// Unprintable roll margin in mm (default: 50)
    #[arg(long)]
    margin: Option<f64>,

    /// Roll widths in mm, comma separated (default: 914,1070,1270,1520)
    #[arg(long)]
    rolls: Option<String>,
}

fn parse_unit(s: &str) -> Result<Unit, String> {
    s.parse()
}

fn parse_size(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("invalid size '{}', expected WxH", s));
    }
    let width = parts[0]
        .parse::<f64>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    let height = parts[1]
        .parse::<f64>()
        .map_err(|_| format!("invalid height in '{}'", s))?;
    if width <= 0.0 || height <= 0.0 {
        return Err(format!("size must be positive in '{}'", s));
    }
    Ok((width, height))
}

fn parse_grid(s: &str) -> Result<(u32, u32), String> {
    let (cols, rows) = s
        .split_once('x')
        .ok_or_else(|| format!("invalid grid '{}', expected COLSxROWS", s))?;
    let cols = cols
        .parse::<u32>()
        .map_err(|_| format!("invalid column count in '{}'", s))?;
    let rows = rows
        .parse::<u32>()
        .map_err(|_| format!("invalid row count in '{}'", s))?;
    Ok((cols, rows))
}

fn load_source(args: &ImageArgs) -> Result<SourceImage, String> {
    let (width, height) = parse_size(&args.size)?;
    let (width_px, height_px) = match args.unit {
        Unit::Px => (width, height),
        Unit::Mm => (
            units::to_px(width, args.dpi).map_err(|e| e.to_string())?,
            units::to_px(height, args.dpi).map_err(|e| e.to_string())?,
        ),
    };
    Ok(SourceImage::new(args.name.clone(), width_px, height_px, args.dpi))
}

fn load_config(args: &PlannerArgs) -> Result<PlannerConfig, String> {
    let mut config = match &args.config {
        Some(path) => PlannerConfig::from_file(path).map_err(|e| e.to_string())?,
        None => PlannerConfig::default(),
    };
    if let Some(overlap) = args.overlap {
        config.overlap = overlap;
    }
    if let Some(margin) = args.margin {
        config.margin = margin;
    }
    if let Some(rolls) = &args.rolls {
        config.roll_widths = parse_roll_widths(rolls)?;
    }
    Ok(config)
}

fn open_session(image: &ImageArgs, planner: &PlannerArgs) -> Result<Session, String> {
    let mut session = Session::new(load_config(planner)?);
    let source = load_source(image)?;
    let dims = session.open(source).map_err(|e| e.to_string())?;
    println!("File: {} | {} | {:.0} dpi", image.name, dims, image.dpi);
    Ok(session)
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Plan {
            image,
            planner,
            layout,
            pick,
        } => {
            let mut session = open_session(&image, &planner)?;
            let area = session.dimensions().map_err(|e| e.to_string())?.area();
            match session.calculate_plans().map_err(|e| e.to_string())? {
                PlanOutcome::NoFeasiblePlan => {
                    println!("No feasible plan for any roll width");
                    return Ok(());
                }
                PlanOutcome::Ranked(plans) => {
                    print!("{}", report::render_plan_table(plans, area));
                }
            }
            if layout {
                let plan = session.select(pick).map_err(|e| e.to_string())?.clone();
                println!("\nPlan {pick}: {} on {:.0} mm roll", plan.mode, plan.roll_width);
                print!("{}", report::render_strip_list(&plan));
                let dims = session.dimensions().map_err(|e| e.to_string())?;
                let canvas = SourceImage::new("", dims.width, dims.height, units::MM_PER_INCH);
                let tasks = strip_tasks(&plan, session.config().overlap, &canvas)
                    .map_err(|e| e.to_string())?;
                print!("{}", render::render_layout(dims.width, dims.height, &tasks));
            }
        }
        Command::Grid {
            image,
            planner,
            cols,
            rows,
            layout,
        } => {
            let mut session = open_session(&image, &planner)?;
            let grid = *session.update_grid(cols, rows).map_err(|e| e.to_string())?;
            print!("{}", report::render_grid_summary(&grid));
            if layout {
                let dims = session.dimensions().map_err(|e| e.to_string())?;
                let canvas = SourceImage::new("", dims.width, dims.height, units::MM_PER_INCH);
                let tasks = grid_tasks(&grid, &canvas).map_err(|e| e.to_string())?;
                print!("{}", render::render_layout(dims.width, dims.height, &tasks));
            }
        }
        Command::Export {
            image,
            planner,
            pick,
            grid,
            out,
        } => {
            let mut session = open_session(&image, &planner)?;
            let mut editor = DryRunEditor::new();
            let written = match grid {
                Some(shape) => {
                    let (cols, rows) = parse_grid(&shape)?;
                    session.update_grid(cols, rows).map_err(|e| e.to_string())?;
                    session.export_grid(&mut editor, &out)
                }
                None => {
                    session.calculate_plans().map_err(|e| e.to_string())?;
                    session.select(pick).map_err(|e| e.to_string())?;
                    session.export_selected(&mut editor, &out)
                }
            }
            .map_err(|e| e.to_string())?;

            for call in &editor.calls {
                match call {
                    EditorCall::Crop(rect) => println!("  crop {rect}"),
                    EditorCall::ResizeCanvas(size) => println!("  canvas {size}"),
                    EditorCall::Save(path) => println!("  save {}", path.display()),
                    _ => {}
                }
            }
            println!(
                "Dry run: {} piece{} would be written to {}",
                written,
                if written == 1 { "" } else { "s" },
                out.display()
            );
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
