use std::fmt::Write;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf, absolute};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use clap::builder::styling::Styles;
use clap::{Args, ColorChoice, Parser, Subcommand, crate_version};
use clap_cargo::style::{ERROR, HEADER, INVALID, LITERAL, PLACEHOLDER, USAGE, VALID};
use routearc::geographic::LongitudeMode;
use routearc::measure::{Degrees, Kilometers, Meters};
use routearc::sampler::{SampleError, SampleStep};
use routearc::table::{MissingAirportPolicy, TableError};
use routearc::{
    AIRPORT_POINTS_CSV, AIRPORT_POINTS_GEOJSON, ConversionInfo, GeoJsonInfo, ROUTE_POINTS_CSV,
    ROUTE_POINTS_GEOJSON, RouteArcError, RouteOptions,
};
use tracing::level_filters::LevelFilter;
use tracing::{Level, debug, enabled, error, info, instrument, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry, fmt};

pub const CLAP_STYLING: Styles = Styles::styled()
    .header(HEADER)
    .usage(USAGE)
    .literal(LITERAL)
    .placeholder(PLACEHOLDER)
    .error(ERROR)
    .valid(VALID)
    .invalid(INVALID);

static LONG_VERSION: LazyLock<String> =
    LazyLock::new(|| format!("{} (rustc {})", crate_version!(), env!("RUSTC_VERSION")));

/// Sample flight routes along great circles for mapping
///
/// Given a table of airports and a table of routes between them, produces
/// densely sampled waypoints along the geodesic for each route, splitting
/// routes that cross the anti-meridian, plus GeoJSON for mapping tools.
#[derive(Parser)]
#[command(
    name = "routearc",
    version,
    long_version = LONG_VERSION.as_str(),
    about,
    color = ColorChoice::Auto,
    styles = CLAP_STYLING,
)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,

    /// Configure diagnostic logging level
    ///
    /// INFO logs each route as it's calculated. Set to DEBUG to see a
    /// performance summary following execution.
    #[clap(long, short = 'L', default_value_t = Level::ERROR)]
    log_level: Level,

    /// Log to a file
    #[clap(long)]
    log_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Airport reference table (CSV in the OurAirports layout)
    airports: PathBuf,

    /// Route table (CSV with `from` and `to` columns)
    routes: PathBuf,

    /// Directory to write the output tables into
    #[clap(long, short, default_value = ".")]
    output_dir: PathBuf,

    /// Force overwriting output files, if they already exist.
    #[clap(long, short, action)]
    force: bool,

    /// Sampling step in degrees of arc
    #[clap(long, short = 'a', default_value_t = 1.0, conflicts_with = "distance_step")]
    arc_step: f64,

    /// Sampling step as a distance in kilometers, instead of an arc step
    #[clap(long, short = 'd')]
    distance_step: Option<f64>,

    /// Longitude past which routes are split in two
    #[clap(long, short = 's', default_value_t = 180.0)]
    split_longitude: f64,

    /// Never split routes
    #[clap(long, action, conflicts_with = "split_longitude")]
    no_split: bool,

    /// Sample with longitudes wrapped to [-180, 180] rather than unrolled
    #[clap(long, action)]
    wrapped: bool,

    /// Write longitudes as sampled instead of reducing them to [-180, 180]
    #[clap(long, action)]
    unrolled_output: bool,

    /// What to do with a route that references an airport missing from the
    /// airport table
    #[clap(long, short = 'm', default_value_t = MissingAirportPolicy::Skip)]
    missing_airport: MissingAirportPolicy,

    /// Shorthand for --missing-airport=fail
    #[clap(long, action, conflicts_with = "missing_airport")]
    strict: bool,

    /// Don't write GeoJSON alongside the CSV tables
    #[clap(long, action)]
    no_geojson: bool,
}

impl ConvertArgs {
    fn route_options(&self) -> RouteOptions {
        let step = match self.distance_step {
            Some(km) => SampleStep::Distance(Meters::from(Kilometers(km))),
            None => SampleStep::Arc(Degrees(self.arc_step)),
        };
        RouteOptions::default()
            .with_step(step)
            .with_longitude_mode(if self.wrapped {
                LongitudeMode::Wrapped
            } else {
                LongitudeMode::Unrolled
            })
            .with_split_longitude((!self.no_split).then_some(Degrees(self.split_longitude)))
            .with_missing_airport(if self.strict {
                MissingAirportPolicy::Fail
            } else {
                self.missing_airport
            })
            .with_unrolled_output(self.unrolled_output)
    }
}

#[derive(Args, Debug)]
struct GeoJsonArgs {
    /// Directory containing the tables written by `convert`
    #[clap(default_value = ".")]
    input_dir: PathBuf,

    /// Directory to write the GeoJSON into, if different from the input
    #[clap(long, short)]
    output_dir: Option<PathBuf>,

    /// Force overwriting output files, if they already exist.
    #[clap(long, short, action)]
    force: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample routes into waypoint tables
    ///
    /// Reads the airport and route tables and writes airport_points.csv and
    /// route_points.csv to the output directory, along with their GeoJSON
    /// renditions unless --no-geojson is given.
    Convert(ConvertArgs),

    /// Convert previously written waypoint tables to GeoJSON
    #[command(name = "geojson")]
    GeoJson(GeoJsonArgs),
}

fn open_input(path: &Path, what: &str) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| {
        format!("Opening the {what} at {path:?}. Check that it exists and can be accessed.")
    })?;
    info!("Opened {} file: {:?}", what, absolute(path)?);
    Ok(BufReader::new(file))
}

fn create_output(path: &Path, force: bool) -> Result<BufWriter<File>> {
    if ((force && enabled!(Level::WARN)) || (!force && enabled!(Level::ERROR))) && path.exists() {
        if force {
            warn!("Output file exists and will be overwritten: {:?}", path);
        } else {
            error!(
                "Output file already exists and may not be overwritten: {:?}",
                path
            );
        }
    }
    let file = if force {
        File::create(path)
    } else {
        File::create_new(path)
    }
    .with_context(|| format!("Creating the output file {path:?}"))?;
    info!("Created output file: {:?}", absolute(path)?);
    Ok(BufWriter::new(file))
}

fn write_geojson(input_dir: &Path, output_dir: &Path, force: bool) -> Result<GeoJsonInfo> {
    let res = routearc::convert_tables_to_geojson(
        open_input(&input_dir.join(ROUTE_POINTS_CSV), "route points table")?,
        open_input(&input_dir.join(AIRPORT_POINTS_CSV), "airport points table")?,
        create_output(&output_dir.join(ROUTE_POINTS_GEOJSON), force)?,
        create_output(&output_dir.join(AIRPORT_POINTS_GEOJSON), force)?,
    );
    Ok(res.context("Writing GeoJSON from the waypoint tables")?)
}

#[instrument(level = "trace", skip_all)]
fn convert_cmd(sub_args: &ConvertArgs) -> Result<String> {
    debug!("convert args: {:?}", sub_args);

    let options = sub_args.route_options();
    let dir = &sub_args.output_dir;
    let res = routearc::convert_routes(
        open_input(&sub_args.airports, "airport table")?,
        open_input(&sub_args.routes, "route table")?,
        create_output(&dir.join(AIRPORT_POINTS_CSV), sub_args.force)?,
        create_output(&dir.join(ROUTE_POINTS_CSV), sub_args.force)?,
        &options,
    );
    let info = match &res {
        Err(RouteArcError::Table(TableError::MissingAirport { .. })) => res.context(concat!(
            "A route references an airport that isn't in the airport table. ",
            "Use --missing-airport=skip to leave such routes out."
        )),

        Err(RouteArcError::Sample(SampleError::InvalidStep(_))) => {
            res.context("The sampling step must be a positive number.")
        }

        Err(RouteArcError::Table(TableError::Csv(_))) => res.context(concat!(
            "An input table is not valid CSV, or is missing a required column. ",
            "Check that it is correct."
        )),

        Err(RouteArcError::Io(_)) => res.context(concat!(
            "Writing the output tables to the filesystem. Ensure the output directory exists ",
            "and that you have access permissions to write there."
        )),

        _ => res.map_err(anyhow::Error::from),
    }?;

    let geojson = if sub_args.no_geojson {
        None
    } else {
        Some(write_geojson(dir, dir, sub_args.force)?)
    };

    conversion_report(info, geojson, dir)
}

#[instrument(level = "trace", skip_all)]
fn geojson_cmd(sub_args: &GeoJsonArgs) -> Result<String> {
    debug!("geojson args: {:?}", sub_args);

    let output_dir = sub_args.output_dir.as_ref().unwrap_or(&sub_args.input_dir);
    let info = write_geojson(&sub_args.input_dir, output_dir, sub_args.force)?;

    let mut r = String::new();
    writeln!(
        &mut r,
        "Wrote {} route lines and {} airport points",
        info.lines_written, info.points_written
    )?;
    writeln!(&mut r, "\nOutput is in {}", display_dir(output_dir))?;
    Ok(r)
}

fn conversion_report(
    info: ConversionInfo,
    geojson: Option<GeoJsonInfo>,
    output_dir: &Path,
) -> Result<String> {
    let mut r = String::new();
    writeln!(
        &mut r,
        "Processed {} routes ({} split at the anti-meridian, {} skipped)",
        info.routes_processed, info.routes_split, info.routes_skipped
    )?;
    writeln!(
        &mut r,
        "Wrote {} waypoints and {} airports",
        info.waypoints_written, info.airports_written
    )?;
    if let Some(g) = geojson {
        writeln!(
            &mut r,
            "Wrote {} route lines and {} airport points as GeoJSON",
            g.lines_written, g.points_written
        )?;
    }
    writeln!(&mut r, "\nOutput is in {}", display_dir(output_dir))?;
    Ok(r)
}

fn display_dir(dir: &Path) -> String {
    absolute(dir)
        .unwrap_or(dir.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn main() -> Result<()> {
    // Intentionally avoid wrapping argument parsing errors in anyhow::Result so
    // we preserve Clap's pretty formatting of usage info.
    let args = Cli::parse();

    let log_w: Box<dyn std::io::Write + Send> = match &args.log_file {
        Some(path) => Box::new(File::create(path).context("Creating the log file")?),
        None => Box::new(std::io::stderr()),
    };
    let (appender, _guard) = tracing_appender::non_blocking(log_w);

    // Enable the TRACE-level span tree layer for fmt logging level DEBUG.
    let fmt_layer = fmt::Layer::new()
        .with_writer(appender)
        .with_ansi(args.log_file.is_none())
        .with_target(false)
        .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE)
        .with_filter(LevelFilter::from_level(args.log_level));
    if args.log_level >= Level::DEBUG {
        let span_tree_layer = tracing_span_tree::SpanTree::default().aggregate(true);
        tracing::subscriber::set_global_default(
            Registry::default().with(fmt_layer).with(span_tree_layer),
        )?;
    } else {
        tracing::subscriber::set_global_default(Registry::default().with(fmt_layer))?;
    }

    debug!("routearc {}", crate_version!());

    let report = match &args.cmd {
        Commands::Convert(sub_args) => convert_cmd(sub_args),
        Commands::GeoJson(sub_args) => geojson_cmd(sub_args),
    }?;

    print!("{report}");
    Ok(())
}
