use clap::Parser;
use muncher_server::constants::STARTING_LIVES;
use muncher_server::engine::GameSession;
use muncher_server::rng::Rng;
use muncher_server::types::{InputState, SessionState, Snapshot, SoundCue};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Share code of the level to play; the built-in map when omitted.
    #[arg(long)]
    level: Option<String>,
    #[arg(long)]
    difficulty: Option<usize>,
    #[arg(long)]
    ticks: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<String>,
    difficulty: usize,
    #[serde(rename = "tickBudget")]
    tick_budget: u64,
    seed: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum RunOutcome {
    Win,
    GameOver,
    TickBudget,
    InvalidLevel,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    difficulty: usize,
    outcome: RunOutcome,
    score: i32,
    #[serde(rename = "dotsEaten")]
    dots_eaten: i32,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: i32,
    deaths: i32,
    teleports: i32,
    #[serde(rename = "keysPicked")]
    keys_picked: i32,
    #[serde(rename = "finishedTick")]
    finished_tick: u64,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "difficulty": scenario.difficulty,
                "tickBudget": scenario.tick_budget,
                "customLevel": scenario.level.is_some(),
            }),
        );
        let scenario_run = run_scenario(&scenario);

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &run_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *outcome_counts
            .entry(outcome_key(scenario_run.result.outcome))
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.result.finished_tick),
            json!({
                "outcome": scenario_run.result.outcome,
                "score": scenario_run.result.score,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        println!(
            "{}",
            serde_json::to_string(&scenario_run.result).expect("scenario result should serialize")
        );
        scenario_results.push(scenario_run.result);
    }

    let run_finished_at_ms = now_ms();
    let summary = build_run_summary(
        run_id.clone(),
        run_started_at_ms,
        run_finished_at_ms,
        scenario_results,
        outcome_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &run_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &run_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario) -> ScenarioRunResult {
    let mut session = GameSession::new(scenario.seed);
    session.set_level(scenario.difficulty);

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();

    if let Some(code) = scenario.level.as_deref() {
        if let Err(error) = session.load_level(code) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                0,
                format!("level code rejected: {error}"),
            );
            return finish(
                scenario,
                RunOutcome::InvalidLevel,
                0,
                0,
                Counters::default(),
                anomalies,
                anomaly_records,
            );
        }
    }
    if let Err(error) = session.run() {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            0,
            format!("run rejected: {error}"),
        );
        return finish(
            scenario,
            RunOutcome::InvalidLevel,
            0,
            0,
            Counters::default(),
            anomalies,
            anomaly_records,
        );
    }

    // Wandering pilot: hold a direction, occasionally pick a fresh one.
    let mut pilot = Rng::new(scenario.seed.wrapping_add(1));
    let mut heading = pilot.direction_bit();

    let mut counters = Counters::default();
    let mut outcome = RunOutcome::TickBudget;
    let mut last_tick = 0u64;
    let mut final_score = 0i32;

    for _ in 0..scenario.tick_budget {
        if pilot.bool(0.05) {
            heading = pilot.direction_bit();
        }
        session.tick(input_for_bit(heading));
        let snapshot = session.build_snapshot(true);
        last_tick = snapshot.tick;
        final_score = snapshot.score;

        for message in collect_snapshot_anomalies(&snapshot) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }

        let mut won = false;
        for event in &snapshot.events {
            match event {
                SoundCue::Dot | SoundCue::SuperDot => counters.dots_eaten += 1,
                SoundCue::EatGhost => counters.ghosts_eaten += 1,
                SoundCue::Die => counters.deaths += 1,
                SoundCue::Teleport => counters.teleports += 1,
                SoundCue::Key => counters.keys_picked += 1,
                SoundCue::Win => won = true,
                _ => {}
            }
        }

        if snapshot.state == SessionState::Editor {
            outcome = if won {
                RunOutcome::Win
            } else {
                RunOutcome::GameOver
            };
            break;
        }
    }

    finish(
        scenario,
        outcome,
        final_score,
        last_tick,
        counters,
        anomalies,
        anomaly_records,
    )
}

#[derive(Clone, Copy, Debug, Default)]
struct Counters {
    dots_eaten: i32,
    ghosts_eaten: i32,
    deaths: i32,
    teleports: i32,
    keys_picked: i32,
}

fn finish(
    scenario: &Scenario,
    outcome: RunOutcome,
    score: i32,
    finished_tick: u64,
    counters: Counters,
    anomalies: Vec<String>,
    anomaly_records: Vec<AnomalyRecord>,
) -> ScenarioRunResult {
    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            difficulty: scenario.difficulty,
            outcome,
            score,
            dots_eaten: counters.dots_eaten,
            ghosts_eaten: counters.ghosts_eaten,
            deaths: counters.deaths,
            teleports: counters.teleports,
            keys_picked: counters.keys_picked,
            finished_tick,
            anomalies,
        },
        anomaly_records,
    }
}

fn input_for_bit(bit: u8) -> InputState {
    InputState {
        up: bit == 8,
        down: bit == 2,
        left: bit == 4,
        right: bit == 1,
    }
}

fn collect_snapshot_anomalies(snapshot: &Snapshot) -> Vec<String> {
    let mut anomalies = Vec::new();
    if snapshot.score < 0 {
        anomalies.push(format!("negative score: {}", snapshot.score));
    }
    if snapshot.lives < 0 || snapshot.lives > STARTING_LIVES {
        anomalies.push(format!("lives out of range: {}", snapshot.lives));
    }
    if snapshot.keys < 0 {
        anomalies.push(format!("negative key count: {}", snapshot.keys));
    }
    if snapshot.state == SessionState::Game && snapshot.dots_remaining <= 0 {
        anomalies.push(format!(
            "game still running with {} dots",
            snapshot.dots_remaining
        ));
    }
    if snapshot.tiles.len() != snapshot.rows
        || snapshot.tiles.iter().any(|row| row.len() != snapshot.columns)
    {
        anomalies.push("snapshot grid does not match its dimensions".to_string());
    }
    if snapshot.state == SessionState::Game && snapshot.player.is_none() {
        anomalies.push("running game without a player".to_string());
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }));
    let tick_budget = cli.ticks.unwrap_or(30_000).clamp(1, 1_000_000);
    let difficulty = cli.difficulty.unwrap_or(0).min(9);

    if cli.level.is_some() || cli.difficulty.is_some() || cli.ticks.is_some() {
        return vec![Scenario {
            name: format!("custom-level{difficulty}"),
            level: cli.level.clone(),
            difficulty,
            tick_budget,
            seed,
        }];
    }

    vec![
        Scenario {
            name: "quick-check-level0".to_string(),
            level: None,
            difficulty: 0,
            tick_budget,
            seed,
        },
        Scenario {
            name: "pressure-check-level4".to_string(),
            level: None,
            difficulty: 4,
            tick_budget,
            seed: normalize_seed(seed as u64 + 1),
        },
    ]
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_run_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    RunSummary {
        run_id,
        started_at_ms,
        finished_at_ms,
        scenario_count: scenarios.len(),
        anomaly_count,
        outcome_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    run_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    eprintln!(
        "{}",
        serde_json::to_string(&log_line).expect("structured log should serialize")
    );
}

fn outcome_key(outcome: RunOutcome) -> String {
    match outcome {
        RunOutcome::Win => "win",
        RunOutcome::GameOver => "game_over",
        RunOutcome::TickBudget => "tick_budget",
        RunOutcome::InvalidLevel => "invalid_level",
    }
    .to_string()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).expect("run summary should serialize");
    std::fs::write(path, summary_text)
}
