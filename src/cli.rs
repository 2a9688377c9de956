// ============================================================================
// htmap CLI: headless heat map rendering from the command line
// ============================================================================
//
// Usage examples:
//   htmap -i map.png -o heat.png
//   htmap -i map.png --config style.json --add 120,80 --add 130,85 -o heat.png
//   htmap -i "maps/*.png" --output-dir out/ --auto-color --blur 0
//   htmap -i map.png --ramp ramp.json --remove 40,40 --radius 25
//
// Each input gets its own independent session. Files are processed one after
// another; the per-pixel passes inside each are parallel.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser;

use crate::config::HeatConfig;
use crate::error::Result;
use crate::io::{load_config, load_image, load_ramp, save_image};
use crate::ops::brush::BrushMode;
use crate::ops::classify::Rgb;
use crate::session::Session;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Render heat maps over base map images.
#[derive(Parser, Debug)]
#[command(
    name = "htmap",
    about = "Paint and render heat maps over base map images",
    long_about = "Detects existing heat colors in a map (or bootstraps a region when\n\
                  there are none), applies optional brush stamps, and renders the\n\
                  result through a four-stop color ramp. Dark label text is never\n\
                  recolored.\n\n\
                  Example:\n  \
                  htmap -i map.png -o heat.png\n  \
                  htmap -i \"maps/*.png\" --output-dir out/ --add 200,150"
)]
pub struct CliArgs {
    /// Input map file(s). Glob patterns accepted (e.g. "maps/*.png").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing (`<stem>.png` per input).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// JSON session config (background, sensitivity, ramp, render, brush).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JSON ramp file with exactly four stops, peak first.
    #[arg(long, value_name = "FILE")]
    pub ramp: Option<PathBuf>,

    /// Global layer opacity, 0-1.
    #[arg(long, value_name = "0-1")]
    pub opacity: Option<f32>,

    /// Band edge softness, 0-1.
    #[arg(long, value_name = "0-1")]
    pub blur: Option<f32>,

    /// Detection sensitivity, 0-1.
    #[arg(long, value_name = "0-1")]
    pub sensitivity: Option<f32>,

    /// Map background color as hex (e.g. f7f7f7).
    #[arg(long, value_name = "RRGGBB")]
    pub bg: Option<Rgb>,

    /// Clear the extracted field and bootstrap it with the region filler.
    #[arg(long)]
    pub auto_color: bool,

    /// Add heat at X,Y (repeatable).
    #[arg(long, value_name = "X,Y", allow_hyphen_values = true)]
    pub add: Vec<Point>,

    /// Remove heat at X,Y (repeatable). Applied after every --add.
    #[arg(long, value_name = "X,Y", allow_hyphen_values = true)]
    pub remove: Vec<Point>,

    /// Brush radius in pixels.
    #[arg(long, value_name = "PX")]
    pub radius: Option<f32>,

    /// Brush strength, 0-1.
    #[arg(long, value_name = "0-1")]
    pub strength: Option<f32>,

    /// Brush tip alpha, 0-1.
    #[arg(long, value_name = "0-1")]
    pub alpha: Option<f32>,

    /// Print per-file timing and mirror log output to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

/// A brush position given on the command line as `X,Y`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl FromStr for Point {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f32>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| format!("'{}' is not a coordinate", v.trim()))
        };
        Ok(Point {
            x: parse(x)?,
            y: parse(y)?,
        })
    }
}

impl CliArgs {
    /// Fold the config file, ramp file and individual flags into one config.
    /// Flags win over files.
    pub fn build_config(&self) -> Result<HeatConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => HeatConfig::default(),
        };
        if let Some(path) = &self.ramp {
            config.ramp = load_ramp(path)?;
        }
        if let Some(bg) = self.bg {
            config.background = bg;
        }
        if let Some(s) = self.sensitivity {
            config.sensitivity = s;
        }
        if let Some(o) = self.opacity {
            config.render.opacity = o;
        }
        if let Some(b) = self.blur {
            config.render.blur = b;
        }
        if let Some(r) = self.radius {
            config.brush.radius = r;
        }
        if let Some(s) = self.strength {
            config.brush.strength = s;
        }
        if let Some(a) = self.alpha {
            config.brush.alpha_cap = a;
        }
        config.brush.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let config = match args.build_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref())
        else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                input_path.display()
            );
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &config, &args) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  -> {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log::error!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// ============================================================================
// Per-file pipeline
// ============================================================================

fn run_one(input: &Path, output: &Path, config: &HeatConfig, args: &CliArgs) -> Result<()> {
    let source = load_image(input)?;
    let mut session = Session::new(source, config)?;

    if args.auto_color {
        session.auto_color()?;
    }
    apply_stamps(&mut session, &args.add, BrushMode::Add)?;
    apply_stamps(&mut session, &args.remove, BrushMode::Remove)?;

    let rendered = session.render()?;
    save_image(&rendered, output)?;
    log::info!("{} -> {}", input.display(), output.display());
    Ok(())
}

/// One stroke per point, so each stamp is its own undo step.
fn apply_stamps(session: &mut Session, points: &[Point], mode: BrushMode) -> Result<()> {
    for p in points {
        if session.stamp(p.x, p.y, mode)?.is_none() {
            log::warn!(
                "{} at {},{} missed the image entirely",
                mode.label(),
                p.x,
                p.y
            );
        }
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
pub fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);
        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    log::warn!("pattern '{}' matched no files", pattern);
                }
            }
            Err(e) => {
                log::warn!("invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (`<dir>/<stem>.png`)
/// 3. Fallback: `<stem>_heat.png` beside the input
pub fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();
    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.png", stem)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}_heat.png", stem)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HeatError;

    #[test]
    fn point_parsing() {
        assert_eq!(
            "12,34.5".parse::<Point>().unwrap(),
            Point { x: 12.0, y: 34.5 }
        );
        assert_eq!(" -3 , 4 ".parse::<Point>().unwrap(), Point { x: -3.0, y: 4.0 });
        assert!("12".parse::<Point>().is_err());
        assert!("a,b".parse::<Point>().is_err());
        assert!("inf,0".parse::<Point>().is_err());
    }

    #[test]
    fn output_path_rules() {
        let input = Path::new("maps/europe.png");
        assert_eq!(
            build_output_path(input, Some(Path::new("x.jpg")), None),
            Some(PathBuf::from("x.jpg"))
        );
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out"))),
            Some(PathBuf::from("out/europe.png"))
        );
        assert_eq!(
            build_output_path(input, None, None),
            Some(PathBuf::from("maps/europe_heat.png"))
        );
    }

    #[test]
    fn flags_parse_and_override_defaults() {
        let args = CliArgs::try_parse_from([
            "htmap", "-i", "map.png", "--bg", "#e0e0e0", "--blur", "0", "--add", "10,20",
            "--add", "30,40", "--radius", "25",
        ])
        .unwrap();
        assert_eq!(args.add.len(), 2);
        let cfg = args.build_config().unwrap();
        assert_eq!(cfg.background, Rgb::new(0xe0, 0xe0, 0xe0));
        assert_eq!(cfg.render.blur, 0.0);
        assert_eq!(cfg.brush.radius, 25.0);
        assert_eq!(cfg.brush.strength, 0.15);
    }

    #[test]
    fn bad_radius_flag_is_a_config_error() {
        let args = CliArgs::try_parse_from(["htmap", "-i", "map.png", "--radius", "0"]).unwrap();
        assert!(matches!(
            args.build_config(),
            Err(HeatError::Configuration(_))
        ));
    }

    #[test]
    fn bad_hex_flag_rejected_by_parser() {
        assert!(CliArgs::try_parse_from(["htmap", "-i", "m.png", "--bg", "nope"]).is_err());
    }

    #[test]
    fn negative_brush_points_parse() {
        let args = CliArgs::try_parse_from([
            "htmap", "-i", "m.png", "--add", "-3,4", "--remove", "-10,-2",
        ])
        .unwrap();
        assert_eq!(args.add, vec![Point { x: -3.0, y: 4.0 }]);
        assert_eq!(args.remove, vec![Point { x: -10.0, y: -2.0 }]);
    }
}
