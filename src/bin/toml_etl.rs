use anyhow::Context;
use clap::Parser;
use nest_etl::core::{ConfigProvider, Pipeline};
use nest_etl::utils::{logger, validation::Validate};
use nest_etl::{EtlEngine, JoinPipeline, LocalStorage, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "Nested join-and-render driven by a TOML configuration")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "nest-etl.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override output formats from config (comma separated)
    #[arg(long, value_delimiter = ',')]
    formats: Option<Vec<String>>,

    /// Dry run - extract and join, print a preview, write nothing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;

    // 初始化日誌
    if args.verbose {
        logger::init_cli_logger(true);
    } else if config.json_logs() {
        logger::init_json_logger(false);
    } else if let Some(level) = config.log_level() {
        logger::init_with_level(level);
    } else {
        logger::init_cli_logger(false);
    }

    tracing::info!("🚀 Starting TOML-based nest-etl");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(formats) = args.formats.clone() {
        tracing::info!("🔧 Output formats overridden to: {}", formats.join(", "));
        config.load.output_formats = formats;
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    let pipeline = JoinPipeline::new(LocalStorage::default(), config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be written");
        return perform_dry_run(&pipeline).await;
    }

    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name,
        config.pipeline.version.as_deref().unwrap_or("-")
    );
    println!("  Parents: {}", config.parents_source());
    println!("  Children: {}", config.children_source());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));

    if let Some(bundle) = config.bundle_filename() {
        println!("  Bundle: {} (ZIP)", bundle);
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(pipeline: &JoinPipeline<LocalStorage, TomlConfig>) -> anyhow::Result<()> {
    let config = pipeline.config();

    let mappings = [
        ("parents", config.parent_field_mapping()),
        ("children", config.child_field_mapping()),
    ];
    for (source, mapping) in &mappings {
        if mapping.is_empty() {
            continue;
        }
        println!("🔄 Field Mapping ({}):", source);
        for (from, to) in mapping {
            println!("  {} -> {}", from, to);
        }
    }

    let dataset = pipeline.extract().await.context("extraction failed")?;
    let result = pipeline.transform(dataset).await.context("transform failed")?;

    println!();
    println!("📊 Join Summary:");
    println!("  Parents: {}", result.stats.parents);
    println!("  Children: {}", result.stats.children);
    println!("  Attached: {}", result.stats.matched);
    println!("  Orphans dropped: {}", result.stats.orphans);
    println!();
    println!("🌳 Preview:");
    println!("{}", result.tree_output);

    println!("✅ Dry run complete. Nothing was written.");
    Ok(())
}
