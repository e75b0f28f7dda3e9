use clap::Parser;
use poi_layer::utils::error::ErrorSeverity;
use poi_layer::utils::{logger, validation::Validate};
use poi_layer::{
    AppEvent, ChannelSink, CliArgs, DrawOutcome, DrawnMarkers, InMemoryMap, InfoLayer,
    LayerConfig, LayerError, MapHandle, MapboxClient, RouteOutcome,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting poi-layer");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let mut config = match LayerConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };
    args.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(&args, &config).await {
        tracing::error!(
            "❌ poi-layer failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        std::process::exit(exit_code(&e));
    }

    Ok(())
}

async fn click_feature(
    layer: &InfoLayer,
    drawn: &DrawnMarkers,
    index: usize,
) -> Result<Option<RouteOutcome>, LayerError> {
    let marker = drawn
        .features
        .get(index)
        .copied()
        .ok_or_else(|| LayerError::InvalidConfigValueError {
            field: "--click".to_string(),
            value: index.to_string(),
            reason: format!("Only {} feature markers were drawn", drawn.features.len()),
        })?;

    layer.click(marker).await
}

fn exit_code(error: &LayerError) -> i32 {
    match error.severity() {
        // 只有路線失敗：marker 與輸出檔都已完成，但 --click 的要求沒有達成
        ErrorSeverity::Low => 4,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

async fn run(args: &CliArgs, config: &LayerConfig) -> Result<(), LayerError> {
    let client = Arc::new(MapboxClient::new(
        &config.service.host,
        &config.service.tileset,
        config.access_token()?,
    )?);
    let map = Arc::new(InMemoryMap::new(config.map_center()));

    if args.dry_run {
        let query = config.query_parameters().with_default_center(map.center());
        let url = client.tilequery_url(&query)?;
        let mut shown = url.clone();
        shown.set_query(None);
        println!("🔍 DRY RUN - would query: {}", shown);
        println!("  Layers: {}", query.layers_csv());
        println!("  Radius: {}m, Limit: {}", query.radius, query.effective_limit());
        return Ok(());
    }

    // UI 端：把點擊事件印到終端機
    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel::<AppEvent>();
    let event_printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            println!("💬 [{}:{}] {}", event.kind, event.value, event.message);
        }
    });

    let layer = InfoLayer::new(
        map.clone(),
        client.clone(),
        client,
        Arc::new(ChannelSink(events_tx)),
        &config.display.icon_path,
        config.filter_rules(),
    );

    let drawn = match layer.show(config.query_parameters()).await? {
        DrawOutcome::Presented(drawn) => drawn,
        DrawOutcome::Superseded => return Ok(()),
    };

    println!("📋 {} markers drawn:", drawn.features.len());
    for (i, id) in drawn.features.iter().enumerate() {
        if let Some(item) = layer.presenter().feature_for(*id) {
            println!(
                "  [{}] {} ({}, {:.0}m) -> {}",
                i,
                item.feature.name().unwrap_or("unnamed"),
                item.feature.source_layer(),
                item.feature.distance(),
                item.icon
            );
        }
    }

    // 路線失敗不影響已畫好的 marker：照樣輸出快照，最後再回報錯誤
    let click_result = match args.click {
        Some(index) => Some(click_feature(&layer, &drawn, index).await),
        None => None,
    };
    if let Some(Ok(Some(RouteOutcome::Rendered { points }))) = &click_result {
        println!("🚶 Walking route drawn with {} points", points);
    }

    if let Some(output) = &args.output {
        let snapshot = serde_json::to_string_pretty(&map.to_geojson())?;
        tokio::fs::write(output, snapshot).await?;
        println!("📁 Map snapshot saved to: {}", output);
    }

    // 關閉 sender 讓印事件的 task 結束
    drop(layer);
    let _ = event_printer.await;

    click_result.transpose()?;
    Ok(())
}
