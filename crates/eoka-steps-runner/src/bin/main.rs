use clap::Parser;
use eoka_steps_runner::Step;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "eoka-steps")]
#[command(about = "Run browser test steps from a YAML file")]
#[command(version)]
struct Cli {
    /// Step file to run
    config: PathBuf,

    /// Run in headless mode (overrides config)
    #[arg(long)]
    headless: bool,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate the step file without running
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> eoka_steps_runner::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let params = eoka_steps_runner::Params::from_args(&cli.params)?;
    let mut config = eoka_steps_runner::Config::load_with_params(&cli.config, &params)?;

    if cli.check {
        println!("Config valid: {}", config.name);
        println!("  Target: {}", config.target.url);
        println!(
            "  Steps: {} ({} perform)",
            config.steps.len(),
            config.perform_count()
        );
        for (i, step) in config.steps.iter().enumerate() {
            match step {
                Step::Perform(p) => println!("    {}. {}", i + 1, p),
                other => println!("    {}. {}", i + 1, other.name()),
            }
        }
        if !config.params.is_empty() {
            println!("  Parameters: {}", config.params.len());
            for (name, def) in &config.params {
                let req = if def.required { " (required)" } else { "" };
                let desc = def.description.as_deref().unwrap_or("");
                println!("    - {}{}: {}", name, req, desc);
            }
        }
        return Ok(());
    }

    if cli.headless {
        config.browser.headless = true;
    }

    println!("Running: {}", config.name);

    let mut runner = eoka_steps_runner::Runner::new(&config.browser, config.settings.clone()).await?;
    let result = runner.run(&config).await?;

    println!();
    if result.success {
        println!("✓ Success");
    } else {
        println!("✗ Failed");
        if let Some(ref error) = result.error {
            println!("  Error: {}", error);
        }
    }
    println!("  Steps: {}/{}", result.steps_executed, config.steps.len());
    if result.failures > 0 {
        println!("  Failures: {}", result.failures);
    }
    println!("  Duration: {}ms", result.duration_ms);

    runner.close().await?;

    if !result.success {
        std::process::exit(1);
    }

    Ok(())
}
