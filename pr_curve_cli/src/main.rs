use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::fs::File;
use std::io::{self, Write};
use std::panic;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use plotters::prelude::*;
use pr_curve::normalize::DEFAULT_MAX_ADDITIONS;
use pr_curve::{
    decode_reviewers_with_outcome, normalize, Animation, Category, CurveRequest, Dataset,
    DecodeOutcome, DisplayNames, GroupingDimension, NormalizeRules, RawRecord, SkipReason,
    WeightMetric, MONTH_TICKS,
};
use rayon::prelude::*;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Cumulative pull-request activity CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute one animated view and write its frames
    Animate(AnimateArgs),
    /// Compute the year, contributor and reviewer views into a directory
    Dashboard(DashboardArgs),
    /// Summarize a PR export: buckets, skipped rows, years, reviewer fields
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// PR export CSV
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// JSON object mapping account logins to display names
    #[arg(long, value_hint = ValueHint::FilePath)]
    names: Option<PathBuf>,

    /// Drop records with more added lines than this
    #[arg(long, default_value_t = DEFAULT_MAX_ADDITIONS)]
    max_additions: f64,

    /// Extra automated accounts to drop (comma separated)
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct AnimateArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Dataset buckets to include (default: all)
    #[arg(long = "dataset", value_enum, value_delimiter = ',')]
    datasets: Vec<DatasetOpt>,

    /// Series grouping
    #[arg(long, value_enum, default_value_t = DimensionOpt::Year)]
    dimension: DimensionOpt,

    /// Weight metric (count|lines_added|net_lines|comments)
    #[arg(long, default_value = "count")]
    metric: String,

    /// Calendar year (required for contributor and reviewer views)
    #[arg(long)]
    year: Option<i32>,

    /// Number of groups carrying a persistent label
    #[arg(long, default_value_t = pr_curve::DEFAULT_TOP_N)]
    top_n: usize,

    /// Days between consecutive frames
    #[arg(long, default_value_t = pr_curve::DEFAULT_DAY_STRIDE)]
    day_stride: u32,

    /// Output frames CSV path (`-` for stdout)
    #[arg(short, long, default_value = "frames.csv", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Output animated figure JSON path
    #[arg(long, value_hint = ValueHint::FilePath)]
    json: Option<PathBuf>,

    /// Output PNG snapshot of the last frame
    #[arg(long, value_hint = ValueHint::FilePath)]
    png: Option<PathBuf>,

    /// Output SVG snapshot of the last frame
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,

    /// Profile major stages with timings
    #[arg(long, action = ArgAction::SetTrue)]
    profile: bool,
}

#[derive(Parser, Debug)]
struct DashboardArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Dataset buckets to include (default: all)
    #[arg(long = "dataset", value_enum, value_delimiter = ',')]
    datasets: Vec<DatasetOpt>,

    /// Weight metric for the year and contributor views
    #[arg(long, default_value = "count")]
    metric: String,

    /// Year for the user views (default: latest year present)
    #[arg(long)]
    year: Option<i32>,

    /// Output directory for figure JSON files
    #[arg(short, long, default_value = "dashboard", value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    /// Profile major stages with timings
    #[arg(long, action = ArgAction::SetTrue)]
    profile: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output report path (`-` for stdout)
    #[arg(short, long, default_value = "-", value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DatasetOpt {
    MapperTemplate,
    SpaceIntelligence,
    QgisPlugins,
}

impl From<DatasetOpt> for Category {
    fn from(value: DatasetOpt) -> Self {
        match value {
            DatasetOpt::MapperTemplate => Category::MapperTemplate,
            DatasetOpt::SpaceIntelligence => Category::SpaceIntelligence,
            DatasetOpt::QgisPlugins => Category::QgisPlugins,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DimensionOpt {
    Year,
    Contributor,
    Reviewer,
}

impl From<DimensionOpt> for GroupingDimension {
    fn from(value: DimensionOpt) -> Self {
        match value {
            DimensionOpt::Year => GroupingDimension::Year,
            DimensionOpt::Contributor => GroupingDimension::Contributor,
            DimensionOpt::Reviewer => GroupingDimension::Reviewer,
        }
    }
}

impl Command {
    fn verbose(&self) -> bool {
        match self {
            Command::Animate(args) => args.source.verbose,
            Command::Dashboard(args) => args.source.verbose,
            Command::Inspect(args) => args.source.verbose,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.command.verbose() { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Animate(args) => handle_animate(args),
        Command::Dashboard(args) => handle_dashboard(args),
        Command::Inspect(args) => handle_inspect(args),
    }
}

fn selection_from(datasets: &[DatasetOpt]) -> BTreeSet<Category> {
    if datasets.is_empty() {
        return Category::ALL.iter().copied().collect();
    }
    datasets.iter().map(|&d| Category::from(d)).collect()
}

fn load_dataset(source: &SourceArgs) -> Result<Dataset> {
    let records = load_records(&source.input)?;
    let names = match source.names.as_ref() {
        Some(path) => load_names(path)?,
        None => DisplayNames::default(),
    };
    let mut rules = NormalizeRules::default();
    if !(source.max_additions.is_finite() && source.max_additions >= 0.0) {
        return Err(anyhow!(
            "--max-additions must be a non-negative number, got {}",
            source.max_additions
        ));
    }
    rules.max_additions = source.max_additions;
    rules.excluded_accounts.extend(
        source
            .exclude
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    );
    Ok(Dataset::new(records, names, rules))
}

/// Read a PR export; rows that cannot be read at all are skipped with a warning.
fn load_records(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut records = Vec::new();
    let mut bad_rows = 0usize;
    for (idx, row) in reader.deserialize::<RawRecord>().enumerate() {
        match row {
            Ok(record) => records.push(record),
            Err(err) => {
                bad_rows += 1;
                warn!("Skipping row {} of {}: {}", idx + 2, path.display(), err);
            }
        }
    }
    info!(
        "Loaded {} records from {} ({} unreadable)",
        records.len(),
        path.display(),
        bad_rows
    );
    Ok(records)
}

fn load_names(path: &Path) -> Result<DisplayNames> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read display names {}", path.display()))?;
    let names = DisplayNames::from_json_str(&text)
        .with_context(|| format!("{} is not a valid display-name table", path.display()))?;
    if names.is_empty() {
        warn!("Display-name table {} had no entries", path.display());
    }
    Ok(names)
}

fn handle_animate(args: AnimateArgs) -> Result<()> {
    let t_load = Instant::now();
    let dataset = load_dataset(&args.source)?;
    if args.profile {
        info!(
            "Load stage: {:.1} ms",
            t_load.elapsed().as_secs_f64() * 1000.0
        );
    }

    let request = CurveRequest {
        dataset_selection: selection_from(&args.datasets),
        dimension: args.dimension.into(),
        weight_metric: WeightMetric::parse_lenient(&args.metric),
        year: args.year,
        top_n: args.top_n,
        day_stride: args.day_stride,
    };

    let t_compute = Instant::now();
    let animation = dataset
        .animate(&request)
        .context("failed to compute animation")?;
    if args.profile {
        info!(
            "Compute stage: {:.1} ms ({} frames)",
            t_compute.elapsed().as_secs_f64() * 1000.0,
            animation.frames.len()
        );
    }
    info!(
        "{}: {} groups, {} frames, {} of {} records used",
        animation.labels.title,
        animation.series.len(),
        animation.frames.len(),
        animation.stats.records_used,
        animation.stats.records_seen
    );
    for (reason, count) in &animation.stats.skipped {
        debug!("skipped {} records: {}", count, reason.as_str());
    }

    if args.output.as_os_str() == "-" {
        write_frames_stdout(&animation)?;
    } else {
        let t_csv = Instant::now();
        write_frames_csv(&animation, &args.output)?;
        if args.profile {
            info!(
                "CSV stage: {:.1} ms",
                t_csv.elapsed().as_secs_f64() * 1000.0
            );
        }
        info!("Wrote frames CSV: {}", args.output.display());
    }

    if let Some(path) = args.json.as_ref() {
        write_figure(&animation, path)?;
        info!("Wrote figure: {}", path.display());
    }

    if let Some(path) = args.png.as_ref() {
        let t_plot = Instant::now();
        if let Err(err) = render_snapshot_guard(&animation, path, ChartKind::Png) {
            warn!("Skipping PNG render ({}): {}", path.display(), err);
        } else {
            info!("Wrote plot: {}", path.display());
        }
        if args.profile {
            info!(
                "Plot stage: {:.1} ms",
                t_plot.elapsed().as_secs_f64() * 1000.0
            );
        }
    }
    if let Some(path) = args.svg.as_ref() {
        if let Err(err) = render_snapshot_guard(&animation, path, ChartKind::Svg) {
            warn!("Skipping SVG render ({}): {}", path.display(), err);
        } else {
            info!("Wrote plot: {}", path.display());
        }
    }

    Ok(())
}

fn dashboard_requests(
    selection: &BTreeSet<Category>,
    year: i32,
    metric: WeightMetric,
) -> Vec<CurveRequest> {
    vec![
        CurveRequest::year_comparison(selection.clone(), metric),
        CurveRequest::contributors(selection.clone(), year, metric),
        CurveRequest::reviewers(selection.clone(), year),
    ]
}

/// Compute every view over the shared dataset and write `<dimension>.json` per view.
fn write_dashboard(
    dataset: &Dataset,
    requests: &[CurveRequest],
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let animations = requests
        .par_iter()
        .map(|request| {
            dataset
                .animate(request)
                .with_context(|| format!("failed to compute {} view", request.dimension))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut written = Vec::with_capacity(animations.len());
    for animation in &animations {
        let path = out_dir.join(format!("{}.json", animation.request.dimension.id()));
        write_figure(animation, &path)?;
        info!(
            "Wrote {} view ({} groups): {}",
            animation.request.dimension,
            animation.series.len(),
            path.display()
        );
        written.push(path);
    }
    Ok(written)
}

fn handle_dashboard(args: DashboardArgs) -> Result<()> {
    let t_load = Instant::now();
    let dataset = load_dataset(&args.source)?;
    if args.profile {
        info!(
            "Load stage: {:.1} ms",
            t_load.elapsed().as_secs_f64() * 1000.0
        );
    }

    let selection = selection_from(&args.datasets);
    let year = match args.year {
        Some(year) => year,
        None => dataset
            .years(&selection)
            .into_iter()
            .next_back()
            .ok_or_else(|| anyhow!("no merged records in the selected datasets"))?,
    };
    let metric = WeightMetric::parse_lenient(&args.metric);

    let t_compute = Instant::now();
    let requests = dashboard_requests(&selection, year, metric);
    let written = write_dashboard(&dataset, &requests, &args.out_dir)?;
    if args.profile {
        info!(
            "Compute stage: {:.1} ms ({} views)",
            t_compute.elapsed().as_secs_f64() * 1000.0,
            written.len()
        );
    }
    Ok(())
}

#[derive(Debug, Default)]
struct InspectReport {
    rows: usize,
    per_category: BTreeMap<Category, usize>,
    skipped: BTreeMap<SkipReason, usize>,
    years: BTreeMap<i32, usize>,
    reviewer_fields: BTreeMap<&'static str, usize>,
    reviewers_accepted: usize,
    reviewers_skipped: usize,
}

fn inspect_dataset(dataset: &Dataset) -> InspectReport {
    let selection: BTreeSet<Category> = Category::ALL.iter().copied().collect();
    let mut report = InspectReport {
        rows: dataset.len(),
        ..InspectReport::default()
    };

    for record in &dataset.records {
        let category = Category::from_repo_name(record.repo_name.as_deref());
        *report.per_category.entry(category).or_insert(0) += 1;

        let merged = match normalize(record, &selection, &dataset.rules) {
            Ok(merged) => merged,
            Err(reason) => {
                *report.skipped.entry(reason).or_insert(0) += 1;
                continue;
            }
        };
        *report.years.entry(merged.year).or_insert(0) += 1;

        let (_, outcome) = decode_reviewers_with_outcome(record.requested_reviewers.as_deref());
        let kind = match outcome {
            DecodeOutcome::Absent => "absent",
            DecodeOutcome::Malformed => "malformed",
            DecodeOutcome::Decoded { accepted, skipped } => {
                report.reviewers_accepted += accepted;
                report.reviewers_skipped += skipped;
                "decoded"
            }
        };
        *report.reviewer_fields.entry(kind).or_insert(0) += 1;
    }
    report
}

fn format_report(report: &InspectReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("rows: {}\n", report.rows));

    out.push_str("categories:\n");
    for (category, count) in &report.per_category {
        out.push_str(&format!("  - {}: {}\n", category.display_name(), count));
    }

    if !report.skipped.is_empty() {
        out.push_str("skipped:\n");
        for (reason, count) in &report.skipped {
            out.push_str(&format!("  - {}: {}\n", reason.as_str(), count));
        }
    }

    out.push_str("years:\n");
    for (year, count) in &report.years {
        out.push_str(&format!("  - {}: {}\n", year, count));
    }

    out.push_str("requested_reviewers:\n");
    for (kind, count) in &report.reviewer_fields {
        out.push_str(&format!("  - {}: {}\n", kind, count));
    }
    out.push_str(&format!(
        "  reviewers: accepted={}, skipped={}\n",
        report.reviewers_accepted, report.reviewers_skipped
    ));
    out
}

fn handle_inspect(args: InspectArgs) -> Result<()> {
    let dataset = load_dataset(&args.source)?;
    let report = format_report(&inspect_dataset(&dataset));

    if args.output.as_os_str() == "-" {
        io::stdout().lock().write_all(report.as_bytes())?;
    } else {
        fs::write(&args.output, report)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
        info!("Inspection report written: {}", args.output.display());
    }
    Ok(())
}

fn write_frames_stdout(animation: &Animation) -> Result<()> {
    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::Writer::from_writer(handle);
    write_frame_rows(animation, &mut writer)
}

fn write_frames_csv(animation: &Animation, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_frame_rows(animation, &mut writer)
}

fn write_frame_rows<W: Write>(animation: &Animation, writer: &mut csv::Writer<W>) -> Result<()> {
    writer.write_record([
        "frame_day",
        "group",
        "day_of_year",
        "cumulative_value",
        "show_label",
        "carried",
    ])?;

    for frame in &animation.frames {
        for point in &frame.points {
            writer.write_record([
                frame.day.to_string(),
                point.group_key.clone(),
                point.day_of_year.to_string(),
                format!("{:.3}", point.cumulative_value),
                point.show_label.to_string(),
                point.carried.to_string(),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

const YEAR_COLORS: [(&str, &str); 2] = [("2024", "#C26E75"), ("2025", "#75303B")];
const YEAR_FALLBACK_COLORS: [&str; 4] = ["#636EFA", "#EF553B", "#00CC96", "#AB63FA"];
const USER_COLORS: [&str; 10] = [
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

/// Stable per-series color: fixed colors for known years, palette by position otherwise.
fn series_color(dimension: GroupingDimension, key: &str, idx: usize) -> &'static str {
    match dimension {
        GroupingDimension::Year => YEAR_COLORS
            .iter()
            .find(|(year, _)| *year == key)
            .map(|(_, color)| *color)
            .unwrap_or(YEAR_FALLBACK_COLORS[idx % YEAR_FALLBACK_COLORS.len()]),
        _ => USER_COLORS[idx % USER_COLORS.len()],
    }
}

fn hex_to_rgb(hex: &str) -> RGBColor {
    let digits = hex.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        digits
            .get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(128)
    };
    if digits.len() != 6 {
        return RGBColor(128, 128, 128);
    }
    RGBColor(channel(0..2), channel(2..4), channel(4..6))
}

/// Plotly-compatible animated figure: two traces per group (line + current marker).
fn figure_json(animation: &Animation) -> Result<JsonValue> {
    let labels = &animation.labels;
    let fingerprint = animation.request.fingerprint()?;
    if animation.is_empty() {
        return Ok(json!({
            "data": [],
            "frames": [],
            "layout": {
                "title": {"text": labels.title},
                "meta": {"fingerprint": fingerprint},
            },
        }));
    }

    let dimension = animation.request.dimension;
    let marker_size = if dimension == GroupingDimension::Year { 12 } else { 10 };
    let hover = |key: &str| {
        format!(
            "<b>{}</b><br>{}: %{{y}}<extra></extra>",
            key, labels.y_axis_title
        )
    };

    let mut data = Vec::with_capacity(animation.series.len() * 2);
    for (idx, series) in animation.series.iter().enumerate() {
        let color = series_color(dimension, &series.group_key, idx);
        let labelled = animation.top_labels.contains(&series.group_key);
        data.push(json!({
            "type": "scatter",
            "x": [],
            "y": [],
            "mode": "lines",
            "name": series.group_key,
            "line": {"color": color, "width": 2},
            "showlegend": true,
            "hovertemplate": hover(&series.group_key),
        }));
        data.push(json!({
            "type": "scatter",
            "x": [],
            "y": [],
            "mode": if labelled { "markers+text" } else { "markers" },
            "name": series.group_key,
            "marker": {"size": marker_size, "color": color},
            "text": [],
            "textposition": "middle right",
            "textfont": {"color": color, "size": marker_size},
            "showlegend": false,
            "hovertemplate": hover(&series.group_key),
        }));
    }

    let mut frames = Vec::with_capacity(animation.frames.len());
    for frame in &animation.frames {
        let mut frame_data = Vec::with_capacity(animation.series.len() * 2);
        for (idx, series) in animation.series.iter().enumerate() {
            let color = series_color(dimension, &series.group_key, idx);
            let (xs, ys): (Vec<u32>, Vec<f64>) = series
                .points()
                .take_while(|p| p.day_of_year <= frame.day)
                .map(|p| (p.day_of_year, p.cumulative_value))
                .unzip();
            frame_data.push(json!({
                "type": "scatter",
                "x": xs,
                "y": ys,
                "mode": "lines",
                "name": series.group_key,
                "line": {"color": color, "width": 2},
            }));

            let marker = match frame.point(&series.group_key) {
                Some(point) => json!({
                    "type": "scatter",
                    "x": [point.day_of_year],
                    "y": [point.cumulative_value],
                    "mode": if point.show_label { "markers+text" } else { "markers" },
                    "name": series.group_key,
                    "marker": {"size": marker_size, "color": color},
                    "text": if point.show_label { vec![series.group_key.clone()] } else { Vec::new() },
                    "textposition": "middle right",
                }),
                None => json!({"type": "scatter", "x": [], "y": [], "mode": "markers", "text": []}),
            };
            frame_data.push(marker);
        }
        frames.push(json!({"name": frame.name(), "data": frame_data}));
    }

    let steps: Vec<JsonValue> = animation
        .frames
        .iter()
        .step_by(7)
        .map(|frame| {
            json!({
                "args": [[frame.name()], {"frame": {"duration": 0, "redraw": true}, "mode": "immediate"}],
                "label": format!("Day {}", frame.day),
                "method": "animate",
            })
        })
        .collect();

    let (tick_vals, tick_text): (Vec<u32>, Vec<&str>) = MONTH_TICKS.iter().copied().unzip();

    Ok(json!({
        "data": data,
        "frames": frames,
        "layout": {
            "title": {"text": labels.title},
            "height": 600,
            "showlegend": true,
            "plot_bgcolor": "white",
            "paper_bgcolor": "white",
            "xaxis": {
                "title": {"text": labels.x_axis_title},
                "range": [0, 366],
                "tickmode": "array",
                "tickvals": tick_vals,
                "ticktext": tick_text,
                "showgrid": true,
                "gridcolor": "#f0f0f0",
            },
            "yaxis": {
                "title": {"text": labels.y_axis_title},
                "range": [0.0, animation.max_value * 1.1],
                "showgrid": true,
                "gridcolor": "#f0f0f0",
            },
            "updatemenus": [{
                "type": "buttons",
                "showactive": false,
                "buttons": [
                    {"label": "Play", "method": "animate", "args": [null, {
                        "frame": {"duration": labels.frame_duration_ms, "redraw": true},
                        "fromcurrent": true,
                        "mode": "immediate",
                    }]},
                    {"label": "Pause", "method": "animate", "args": [[null], {
                        "frame": {"duration": 0, "redraw": false},
                        "mode": "immediate",
                    }]},
                ],
            }],
            "sliders": [{
                "steps": steps,
                "active": 0,
                "x": 0.1,
                "len": 0.9,
                "xanchor": "left",
                "y": 0,
                "yanchor": "top",
            }],
            "meta": {"fingerprint": fingerprint},
        },
    }))
}

fn write_figure(animation: &Animation, path: &Path) -> Result<()> {
    let figure = figure_json(animation)?;
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer(io::BufWriter::new(file), &figure)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

enum ChartKind {
    Png,
    Svg,
}

fn render_snapshot_guard(
    animation: &Animation,
    path: &Path,
    kind: ChartKind,
) -> Result<(), String> {
    let render = || -> Result<(), String> {
        render_snapshot(animation, path, kind).map_err(|e| format!("plotting error: {}", e))
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
}

fn render_snapshot(animation: &Animation, path: &Path, kind: ChartKind) -> Result<()> {
    if animation.is_empty() {
        return Err(anyhow!("nothing to draw for '{}'", animation.labels.title));
    }
    match kind {
        ChartKind::Png => {
            let root = BitMapBackend::new(path, (1280, 760)).into_drawing_area();
            draw_snapshot(root, animation)
        }
        ChartKind::Svg => {
            let root = SVGBackend::new(path, (1280, 760)).into_drawing_area();
            draw_snapshot(root, animation)
        }
    }
}

fn month_label(day: f64) -> String {
    MONTH_TICKS
        .iter()
        .rev()
        .find(|(start, _)| (*start as f64) <= day)
        .map(|(_, name)| name.to_string())
        .unwrap_or_default()
}

/// Last frame as a static chart: each line up to the frame day, its marker, and top-N labels.
fn draw_snapshot<DB>(
    root: DrawingArea<DB, plotters::coord::Shift>,
    animation: &Animation,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let Some(last) = animation.frames.last() else {
        return Ok(());
    };
    let y_min = animation
        .series
        .iter()
        .flat_map(|s| s.values().iter().copied())
        .fold(0.0_f64, f64::min);
    let y_max = (animation.max_value * 1.1).max(1.0);

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&animation.labels.title, ("sans-serif", 24))
        .margin(25)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(0.0..366.0, y_min..y_max)?;

    chart
        .configure_mesh()
        .light_line_style(&TRANSPARENT)
        .x_labels(13)
        .x_label_formatter(&|v: &f64| month_label(*v))
        .y_label_formatter(&|v| format!("{:.0}", v))
        .x_desc(animation.labels.x_axis_title.as_str())
        .y_desc(animation.labels.y_axis_title.as_str())
        .draw()?;

    let dimension = animation.request.dimension;
    for (idx, series) in animation.series.iter().enumerate() {
        let color = hex_to_rgb(series_color(dimension, &series.group_key, idx));
        let style = ShapeStyle {
            color: color.to_rgba(),
            filled: false,
            stroke_width: 2,
        };
        chart.draw_series(LineSeries::new(
            series
                .points()
                .take_while(|p| p.day_of_year <= last.day)
                .map(|p| (p.day_of_year as f64, p.cumulative_value)),
            style,
        ))?;

        let Some(point) = last.point(&series.group_key) else {
            continue;
        };
        let pos = (point.day_of_year as f64, point.cumulative_value);
        chart.draw_series(std::iter::once(Circle::new(pos, 5, color.filled())))?;
        if point.show_label {
            chart.draw_series(std::iter::once(Text::new(
                series.group_key.clone(),
                pos,
                ("sans-serif", 14).into_font().color(&color),
            )))?;
        }
    }

    root.present()?;
    Ok(())
}
