//! gcode-tools - command-line front end for the G-code transforms.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use gcode_tools::config::{DEFAULT_SAFE_HEIGHT, SETTINGS_FILE};
use gcode_tools::generator::{area_cut, center_cut, format_value, Pocket};
use gcode_tools::model::AxisRange;
use gcode_tools::{
    merge_documents, multipass, optimize_with_report, serialize_with, validate_program,
    ArcCorrector, CommandWindow, FilterChain, Flip, Parser as GcodeParser, Program, Rotate,
    Settings, SwapXY, Translate, ZLevel,
};

/// Parse, transform and optimise G-code toolpaths.
#[derive(Parser, Debug)]
#[command(name = "gcode-tools")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to gcode.json in the current directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Io {
    /// Input G-code file
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PocketArgs {
    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pocket size along X
    #[arg(long)]
    width: Option<f64>,

    /// Pocket size along Y
    #[arg(long)]
    height: Option<f64>,

    /// Tool diameter
    #[arg(long)]
    tool: Option<f64>,

    /// Cut depth
    #[arg(long, allow_negative_numbers = true)]
    cut: Option<f64>,

    /// Safe height between cuts
    #[arg(long, allow_negative_numbers = true)]
    safe: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the bounding box of a program
    Bounds {
        /// Input G-code file
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a program for problems
    Check {
        /// Input G-code file
        input: PathBuf,
    },

    /// Move the lower-left corner of the program to X0 Y0
    Reorigin {
        #[command(flatten)]
        io: Io,
    },

    /// Shift the program by fixed offsets
    Translate {
        #[command(flatten)]
        io: Io,

        #[arg(long, allow_negative_numbers = true)]
        dx: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        dy: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        dz: Option<f64>,
    },

    /// Rotate the program about the origin
    Rotate {
        #[command(flatten)]
        io: Io,

        /// Counter-clockwise angle in degrees
        #[arg(long, allow_negative_numbers = true)]
        angle: Option<f64>,
    },

    /// Exchange the X and Y axes
    Swap {
        #[command(flatten)]
        io: Io,
    },

    /// Mirror the program (`--x` alone mirrors about the centre of the bounds)
    Flip {
        #[command(flatten)]
        io: Io,

        /// Mirror X about this line
        #[arg(long, num_args = 0..=1, require_equals = true, allow_negative_numbers = true)]
        x: Option<Option<f64>>,

        /// Mirror Y about this line
        #[arg(long, num_args = 0..=1, require_equals = true, allow_negative_numbers = true)]
        y: Option<Option<f64>>,
    },

    /// Set the cut depth and safe height
    Zlevel {
        #[command(flatten)]
        io: Io,

        /// Depth for every Z below zero
        #[arg(long, allow_negative_numbers = true)]
        cut: Option<f64>,

        /// Height for every Z above zero
        #[arg(long, allow_negative_numbers = true)]
        safe: Option<f64>,
    },

    /// Make arc centres consistent with their end points
    FixArcs {
        #[command(flatten)]
        io: Io,
    },

    /// Re-order cuts to reduce travel
    Optimize {
        #[command(flatten)]
        io: Io,
    },

    /// Repeat the program in several passes down to the full depth
    Multipass {
        #[command(flatten)]
        io: Io,

        /// Total cut depth
        #[arg(long, allow_negative_numbers = true)]
        cut: Option<f64>,

        /// Safe height between cuts
        #[arg(long, allow_negative_numbers = true)]
        safe: Option<f64>,

        /// Maximum depth of a single pass
        #[arg(long, allow_negative_numbers = true)]
        step: Option<f64>,
    },

    /// Generate a rectangular pocket cut in rings from the outside in
    AreaCut {
        #[command(flatten)]
        pocket: PocketArgs,
    },

    /// Generate a rectangular pocket cut outwards from a centre line
    CenterCut {
        #[command(flatten)]
        pocket: PocketArgs,
    },

    /// Join several programs into one
    Merge {
        /// Input G-code files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Option values resolved for this run, used to fill the prefix/suffix.
struct Options<'a> {
    settings: &'a Settings,
    values: BTreeMap<String, f64>,
}

impl<'a> Options<'a> {
    fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            values: settings.defaults.clone(),
        }
    }

    fn resolve(&mut self, name: &str, explicit: Option<f64>, fallback: Option<f64>) -> Result<f64> {
        let value = self.settings.resolve(name, explicit, fallback)?;
        self.values.insert(name.to_string(), value);
        Ok(value)
    }

    fn optional(&mut self, name: &str, explicit: Option<f64>) -> Option<f64> {
        self.resolve(name, explicit, None).ok()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for G-code
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = load_settings(cli.settings.as_deref())?;
    let mut options = Options::new(&settings);

    match cli.command {
        Commands::Bounds { input, json } => {
            let program = load(&input, None)?;
            print_bounds(&program, json)?;
        }

        Commands::Check { input } => {
            let program = load(&input, None)?;
            let validation = validate_program(&program);

            for warning in &validation.warnings {
                warn!("{}", warning);
            }

            for err in &validation.errors {
                error!("{}", err);
            }

            if !validation.passed {
                bail!("Validation failed");
            }

            if validation.is_clean() {
                info!("Validation passed");
            } else {
                info!("Validation passed with {} warning(s)", validation.warnings.len());
            }
        }

        Commands::Reorigin { io } => {
            let program = load(&io.input, None)?;
            let translate = Translate::to_origin(&program);
            info!("Moving by X{} Y{}", format_value(translate.dx), format_value(translate.dy));
            let result = program.clone_with(&mut FilterChain::new().with(translate));
            write_output(&result, &options, io.output.as_deref())?;
        }

        Commands::Translate { io, dx, dy, dz } => {
            let dx = options.resolve("dx", dx, Some(0.0))?;
            let dy = options.resolve("dy", dy, Some(0.0))?;
            let dz = options.resolve("dz", dz, Some(0.0))?;
            let program = load(&io.input, None)?;
            let result = program.clone_with(&mut Translate::new(dx, dy, dz));
            write_output(&result, &options, io.output.as_deref())?;
        }

        Commands::Rotate { io, angle } => {
            let angle = options.resolve("angle", angle, None)?;
            let program = load(&io.input, None)?;
            let result = program.clone_with(&mut Rotate::new(angle));
            write_output(&result, &options, io.output.as_deref())?;
        }

        Commands::Swap { io } => {
            let program = load(&io.input, None)?;
            let result = program.clone_with(&mut SwapXY);
            write_output(&result, &options, io.output.as_deref())?;
        }

        Commands::Flip { io, x, y } => {
            let program = load(&io.input, None)?;
            let bounds = program.bounds();
            let x_axis = mirror_line(x, &bounds.x);
            let y_axis = mirror_line(y, &bounds.y);
            if x_axis.is_none() && y_axis.is_none() {
                bail!("Nothing to flip: give --x and/or --y");
            }
            let result = program.clone_with(&mut Flip::new(x_axis, y_axis));
            write_output(&result, &options, io.output.as_deref())?;
        }

        Commands::Zlevel { io, cut, safe } => {
            let cut = options.optional("cut", cut);
            let safe = options.optional("safe", safe);
            if cut.is_none() && safe.is_none() {
                warn!("Neither --cut nor --safe given; Z values unchanged");
            }
            let program = load(&io.input, None)?;
            let result = program.clone_with(&mut ZLevel::new(cut, safe));
            write_output(&result, &options, io.output.as_deref())?;
        }

        Commands::FixArcs { io } => {
            let program = load(&io.input, None)?;
            let mut corrector = ArcCorrector::new();
            let result = program.clone_with(&mut corrector);
            let stats = corrector.stats();
            info!(
                "Arcs: {} adjusted, {} unchanged, {} skipped",
                stats.adjusted, stats.preserved, stats.skipped
            );
            write_output(&result, &options, io.output.as_deref())?;
        }

        Commands::Optimize { io } => {
            let program = load(&io.input, None)?;
            let (result, report) = optimize_with_report(&program);
            info!(
                "Optimised {} primitive(s): travel {} -> {}",
                report.primitives,
                format_value(report.travel_before),
                format_value(report.travel_after)
            );
            if report.dropped > 0 {
                warn!("Dropped {} command(s) between cuts", report.dropped);
            }
            write_output(&result, &options, io.output.as_deref())?;
        }

        Commands::Multipass {
            io,
            cut,
            safe,
            step,
        } => {
            let cut = options.resolve("cut", cut, Some(-2.0))?;
            let safe = options.resolve("safe", safe, Some(3.0))?;
            let step = options.resolve("step", step, Some(-1.0))?;
            let program = load(&io.input, Some(CommandWindow::boilerplate()))?;
            let result = multipass(&program, cut, safe, step);
            write_output(&result, &options, io.output.as_deref())?;
        }

        Commands::AreaCut { pocket } => {
            let shape = resolve_pocket(&pocket, &mut options)?;
            let result = area_cut(&shape)?;
            info!("Area cut: {} command(s)", result.len());
            write_output(&result, &options, pocket.output.as_deref())?;
        }

        Commands::CenterCut { pocket } => {
            let shape = resolve_pocket(&pocket, &mut options)?;
            let result = center_cut(&shape)?;
            info!("Centre cut: {} command(s)", result.len());
            write_output(&result, &options, pocket.output.as_deref())?;
        }

        Commands::Merge { inputs, output } => {
            let mut texts = Vec::with_capacity(inputs.len());
            for path in &inputs {
                texts.push(read(path)?);
            }
            let result = merge_documents(texts.iter().map(String::as_str));
            info!("Merged {} file(s), {} command(s)", inputs.len(), result.len());
            write_output(&result, &options, output.as_deref())?;
        }
    }

    Ok(())
}

fn resolve_pocket(args: &PocketArgs, options: &mut Options) -> Result<Pocket> {
    let width = options.resolve("width", args.width, None)?;
    let height = options.resolve("height", args.height, None)?;
    let tool = options.resolve("tool", args.tool, Some(3.0))?;
    let cut = options.resolve("cut", args.cut, Some(-1.0))?;
    let safe = options.resolve("safe", args.safe, Some(DEFAULT_SAFE_HEIGHT))?;
    Ok(Pocket::new(width, height)
        .with_tool(tool)
        .with_depths(cut, safe))
}

/// `--x` with a value mirrors about it; without one, about the midpoint.
fn mirror_line(arg: Option<Option<f64>>, range: &AxisRange) -> Option<f64> {
    match arg {
        Some(Some(value)) => Some(value),
        Some(None) => range.midpoint(),
        None => None,
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(path) => path,
        None if Path::new(SETTINGS_FILE).exists() => Path::new(SETTINGS_FILE),
        None => return Ok(Settings::default()),
    };

    let settings = Settings::from_json_str(&read(path)?)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    info!("Loaded settings: {}", path.display());
    Ok(settings)
}

fn load(path: &Path, window: Option<CommandWindow>) -> Result<Program> {
    let text = read(path)?;

    let mut parser = GcodeParser::new();
    if let Some(window) = window {
        parser = parser.with_window(window);
    }
    let parsed = parser.parse(&text);

    if !parsed.skipped.is_empty() {
        warn!(
            "{}: {} malformed line(s) ignored",
            path.display(),
            parsed.skipped.len()
        );
    }
    if parsed.program.is_empty() {
        warn!("{}: no commands loaded", path.display());
    }

    info!(
        "Loaded {} ({} commands, units {})",
        path.display(),
        parsed.program.len(),
        parsed.program.units()
    );

    Ok(parsed.program)
}

fn write_output(program: &Program, options: &Options, output: Option<&Path>) -> Result<()> {
    let text = serialize_with(
        program,
        &options.settings.render_prefix(&options.values),
        &options.settings.render_suffix(&options.values),
    );

    match output {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Generated: {}", path.display());
        }
        None => {
            std::io::stdout()
                .lock()
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    Ok(())
}

fn print_bounds(program: &Program, json: bool) -> Result<()> {
    let bounds = program.bounds();

    if json {
        let report = serde_json::json!({
            "units": program.units().to_string(),
            "bounds": bounds,
            "area": bounds.area(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), format_value);
    println!("Units: {}", program.units());
    for (name, range) in [("X", bounds.x), ("Y", bounds.y), ("Z", bounds.z)] {
        println!(
            "{}: {} to {} (size {})",
            name,
            show(range.min),
            show(range.max),
            show(range.size())
        );
    }

    Ok(())
}
