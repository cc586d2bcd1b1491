//! Analyze command handler
//!
//! 1. Load config and merge command-line overrides
//! 2. Parse the transcript
//! 3. Build the classifier for the selected backend
//! 4. Run the checkpointed pipeline (resuming if possible)
//! 5. Write the result files, key moments included

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use chatlens::analyzer::{
    AgentType, CancellationToken, DefaultProgressReporter, JsonCheckpointStore, KeyDates,
    KeyMomentsReport, Pipeline, PipelineOptions, RemoteClassifier, RetryPolicy,
};
use chatlens::cli::AnalyzeArgs;
use chatlens::config::{
    default_analysis_agent, default_analysis_timeout, default_checkpoint_interval,
    default_importance_threshold, default_max_retries, default_output_dir, default_retry_delay,
    default_time_threshold, AnalysisConfig,
};
use chatlens::report::{write_reports, AnalysisReport};
use chatlens::{transcript, Config};

/// Effective settings for one run after merging flags, config and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeSettings {
    pub agent: AgentType,
    pub output_dir: PathBuf,
    pub time_threshold: u64,
    pub max_retries: u32,
    pub retry_delay: u64,
    pub checkpoint_interval: usize,
    pub importance_threshold: u8,
    pub timeout: u64,
}

/// Annotate a transcript and write the result files.
#[cfg(not(tarpaulin_include))]
pub fn handle(args: &AnalyzeArgs) -> Result<()> {
    let config = Config::load()?;
    let settings = resolve_settings(args, &config.analysis)?;

    if !args.chat_file.exists() {
        anyhow::bail!("File not found: {}", args.chat_file.display());
    }
    let messages = transcript::parse_file(&args.chat_file, &args.user_name)
        .with_context(|| format!("Failed to load {}", args.chat_file.display()))?;
    if messages.is_empty() {
        anyhow::bail!(
            "No messages found in {}.\nHint: each message must start with a line like \
             '2024-01-31 18:05:00 <sender>'.",
            args.chat_file.display()
        );
    }
    if !messages.iter().any(|m| m.is_user) {
        eprintln!(
            "Warning: no messages from '{}'; every session will count as opened by the partner",
            args.user_name
        );
    }

    // Fail on a bad key dates file before any service call
    let key_dates = match &args.key_dates {
        Some(path) => KeyDates::load(path)?,
        None => KeyDates::default(),
    };

    let backend = settings.agent.create_backend(
        config.http.to_settings(),
        config.agent_extra_args(settings.agent.command_name()),
    );
    let classifier = RemoteClassifier::new(backend)
        .with_filter(config.filter.to_filter())
        .with_retry_policy(RetryPolicy::new(
            settings.max_retries,
            Duration::from_secs(settings.retry_delay),
        ))
        .with_timeout(Duration::from_secs(settings.timeout));

    if !classifier.is_available() {
        anyhow::bail!(
            "Classifier backend '{}' is not available. Install its CLI (or set the API key for \
             http) or use --agent to specify another.\nSupported agents: {}",
            settings.agent.command_name(),
            AgentType::SUPPORTED
        );
    }

    let store = JsonCheckpointStore::in_dir(&settings.output_dir);
    if args.fresh && store.clear()? && !args.quiet {
        eprintln!("Removed existing checkpoint {}", store.path().display());
    }

    let token = CancellationToken::new();
    token.register_signal_handlers();

    let progress = if args.quiet {
        DefaultProgressReporter::quiet()
    } else {
        DefaultProgressReporter::new()
    };
    let options = PipelineOptions::default()
        .time_threshold(settings.time_threshold)
        .checkpoint_interval(settings.checkpoint_interval);

    if !args.quiet {
        eprintln!(
            "Analyzing {} ({} messages) with {}...",
            args.chat_file.display(),
            messages.len(),
            settings.agent
        );
    }

    let mut pipeline =
        Pipeline::new(options, &classifier, &store, &progress).with_cancellation(token);
    let run = pipeline.run(&messages)?;

    let report = AnalysisReport::build(
        &run.analyzed,
        &run.result,
        &messages,
        run.tracker.summary(),
        settings.importance_threshold,
    );
    let moments = KeyMomentsReport::build(
        &config.moments.to_detector(),
        key_dates,
        &messages,
        &run.analyzed,
        config.moments.window_days,
    );
    let paths = write_reports(&settings.output_dir, &report, &moments)?;

    if !args.quiet {
        eprint!("{}", run.tracker.format_summary());
    }
    println!("Results written to {}", paths.results.display());
    println!("Summary written to {}", paths.summary.display());
    println!("Key moments written to {}", paths.key_moments.display());

    Ok(())
}

/// Merge command-line flags over the `[analysis]` config and validate.
pub fn resolve_settings(args: &AnalyzeArgs, config: &AnalysisConfig) -> Result<AnalyzeSettings> {
    let merged = AnalysisConfig {
        agent: args.agent.clone().or_else(|| config.agent.clone()),
        time_threshold: args.time_threshold.or(config.time_threshold),
        max_retries: args.max_retries.or(config.max_retries),
        retry_delay: args.retry_delay.or(config.retry_delay),
        checkpoint_interval: args.checkpoint_interval.or(config.checkpoint_interval),
        importance_threshold: args.importance_threshold.or(config.importance_threshold),
        timeout: args.timeout.or(config.timeout),
        output_dir: args
            .output_dir
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .or_else(|| config.output_dir.clone()),
    };
    merged
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid option: {}", e))?;

    let agent_name = merged
        .agent
        .or_else(default_analysis_agent)
        .unwrap_or_else(|| "http".to_string());
    let agent = parse_agent_type(&agent_name)?;

    Ok(AnalyzeSettings {
        agent,
        output_dir: PathBuf::from(
            merged
                .output_dir
                .or_else(default_output_dir)
                .unwrap_or_default(),
        ),
        time_threshold: merged
            .time_threshold
            .or_else(default_time_threshold)
            .unwrap_or_default(),
        max_retries: merged.max_retries.or_else(default_max_retries).unwrap_or(1),
        retry_delay: merged.retry_delay.or_else(default_retry_delay).unwrap_or_default(),
        checkpoint_interval: merged
            .checkpoint_interval
            .or_else(default_checkpoint_interval)
            .unwrap_or(1),
        importance_threshold: merged
            .importance_threshold
            .or_else(default_importance_threshold)
            .unwrap_or(1),
        timeout: merged
            .timeout
            .or_else(default_analysis_timeout)
            .unwrap_or(1),
    })
}

/// Parse agent name string to AgentType enum.
fn parse_agent_type(name: &str) -> Result<AgentType> {
    AgentType::parse(name).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown agent: '{}'. Supported agents: {}",
            name,
            AgentType::SUPPORTED
        )
    })
}
