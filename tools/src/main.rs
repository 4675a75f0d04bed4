//! dashboard-runner: headless driver for the attendance dashboard.
//!
//! Usage:
//!   dashboard-runner --seed 42 --population 500
//!   dashboard-runner --config dashboard.json --z-threshold -2.5 --member Member_17
//!   dashboard-runner --ipc-mode

use anyhow::Result;
use attendance_core::{
    dashboard::Dashboard,
    GeneratorConfig, Session, Thresholds,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    SetThresholds(Thresholds),
    Select {
        name: Option<String>,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");

    let mut config = match find_arg(&args, "--config") {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    config.population = parse_arg(&args, "--population", config.population);

    let thresholds = Thresholds::new(
        parse_arg(&args, "--z-threshold", Thresholds::default().z_threshold),
        parse_arg(&args, "--churn-threshold", Thresholds::default().churn_threshold),
    )?;
    let member = find_arg(&args, "--member").map(str::to_string);

    if !ipc_mode {
        println!("Attendance dashboard runner");
        println!("  seed:        {}", config.seed);
        println!("  population:  {}", config.population);
        println!("  z threshold: {:.2}", thresholds.z_threshold);
        println!("  churn:       {:.2}", thresholds.churn_threshold);
        println!();
    }

    let session = Session::new(config)?;

    if ipc_mode {
        let stdin = io::stdin();
        let stdout = io::stdout();
        run_ipc_loop(&session, thresholds, member, stdin.lock(), &mut stdout.lock())?;
    } else {
        print_summary(&session, &thresholds, member.as_deref())?;
    }

    Ok(())
}

/// One JSON command per input line, one JSON line out per command.
/// Bad input is answered with `{"error": ...}` and the loop continues.
fn run_ipc_loop<R: BufRead, W: Write>(
    session: &Session,
    mut thresholds: Thresholds,
    mut member: Option<String>,
    mut input: R,
    output: &mut W,
) -> Result<()> {
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = input.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        // Out-of-range thresholds fail here too: Thresholds only
        // deserializes through its range checks.
        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(output, &e.to_string())?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => {}
            IpcCommand::SetThresholds(t) => thresholds = t,
            IpcCommand::Select { name } => member = name,
        }

        let population = session.population()?;
        let state = Dashboard::new(population).state(thresholds, member.as_deref())?;
        writeln!(output, "{}", serde_json::to_string(&state)?)?;
        output.flush()?;
    }
    Ok(())
}

fn write_error<W: Write>(output: &mut W, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(output, "{}", err_json)?;
    output.flush()?;
    Ok(())
}

fn print_summary(session: &Session, thresholds: &Thresholds, member: Option<&str>) -> Result<()> {
    let population = session.population()?;
    let dashboard = Dashboard::new(population);
    let tiers = dashboard.frequency_tiers();
    let deltas = dashboard.kpi_deltas();

    println!("=== ATTENDANCE KPIs ===");
    println!("  members:        {}", tiers.total);
    println!("  0 visits:       {} ({:+} vs last week)", tiers.zero_visits, deltas.zero_visits);
    println!("  8+ visits:      {} ({:+} vs last week)", tiers.eight_plus, deltas.eight_plus);
    println!("  4+ visits:      {} ({:+} vs last week)", tiers.four_plus, deltas.four_plus);
    println!("  1+ visits:      {}", tiers.one_plus);

    println!();
    println!("=== DROP REASONS (z <= {:.2}) ===", thresholds.z_threshold);
    let anomalies = dashboard.anomalies(thresholds.z_threshold);
    println!("  flagged members: {}", anomalies.len());
    for rc in dashboard.reason_counts(thresholds.z_threshold) {
        println!("  {:<20} {}", rc.category.label(), rc.count);
    }

    println!();
    println!("=== TREND ===");
    println!("  dead cross:     {}", dashboard.dead_cross_members().len());

    println!();
    println!("=== RFM SEGMENTS ===");
    for sc in dashboard.segment_counts() {
        println!("  {:<10} {}", sc.segment.label(), sc.count);
    }

    println!();
    println!("=== HIGH CHURN RISK (>= {:.0}%) ===", thresholds.churn_threshold * 100.0);
    let high_risk = dashboard.high_churn_risk(thresholds.churn_threshold);
    println!("  total: {}", high_risk.len());
    for m in high_risk.iter().take(10) {
        println!(
            "  {:<12} churn {:>5.1}%  z {:>6.2}  {}",
            m.name,
            m.churn_prob * 100.0,
            m.z_score,
            m.rfm_segment.label()
        );
    }

    println!();
    println!("=== MEMBER DETAIL ===");
    let detail = dashboard.select(member, thresholds)?;
    if detail.fell_back {
        println!("  (requested member not found, showing default)");
    }
    println!("  name:      {}", detail.name);
    println!("  z-score:   {:.2}", detail.z_score);
    println!("  churn:     {:.1}% ({:?})", detail.churn_prob * 100.0, detail.churn_flag);
    println!("  recency:   {} days ago", detail.recency);
    println!("  segment:   {}", detail.rfm_segment.label());
    match (detail.reason_category, detail.reason_detail.as_deref()) {
        (Some(c), Some(text)) => println!("  reason:    {} \"{text}\"", c.label()),
        (Some(c), None) => println!("  reason:    {} (no comment submitted)", c.label()),
        (None, _) => println!("  reason:    none recorded"),
    }
    Ok(())
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    find_arg(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
