use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use roadsense_rs::bucketizer::BucketMode;
use roadsense_rs::config::EstimatorConfig;
use roadsense_rs::dashboard;
use roadsense_rs::platform;
use roadsense_rs::session::{SensorFeeds, Session};
use roadsense_rs::uploader::Uploader;

#[derive(Parser, Debug)]
#[command(name = "roadsense")]
#[command(about = "Road data collection quality estimator - simulated drive", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Ingest server base URL
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    server: String,

    /// API key sent as x-api-key (omit to send none)
    #[arg(long)]
    api_key: Option<String>,

    /// Aggregation mode (live, windowed)
    #[arg(long, default_value = "live")]
    bucket_mode: String,

    /// Output directory for node id and live status
    #[arg(long, default_value = "roadsense_sessions")]
    output_dir: String,

    /// Embedded dashboard port (0 = disabled)
    #[arg(long, default_value = "0")]
    dashboard_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    println!("[{}] RoadSense Starting", ts_now());
    println!("  Duration: {} seconds (0=continuous)", args.duration);
    println!("  Server: {}", args.server);
    println!("  Bucket Mode: {}", args.bucket_mode);
    println!("  Output Dir: {}", args.output_dir);

    std::fs::create_dir_all(&args.output_dir)?;
    let node_id = platform::load_or_create_node_id(&PathBuf::from(&args.output_dir).join("node_id"))?;
    println!("  Node Id: {}", node_id);

    let bucket_mode = match args.bucket_mode.as_str() {
        "windowed" => BucketMode::Windowed,
        _ => BucketMode::LiveTick,
    };

    // Simulated platform subscriptions; a real deployment swaps these for
    // actual sensor adapters without touching the session.
    let (location_tx, location_rx) = mpsc::channel(100);
    let (motion_tx, motion_rx) = mpsc::channel(500);
    let (orientation_tx, orientation_rx) = mpsc::channel(100);

    let _location_handle = tokio::spawn(platform::sim_location_loop(location_tx));
    let _motion_handle = tokio::spawn(platform::sim_motion_loop(motion_tx));
    let _orientation_handle = tokio::spawn(platform::sim_orientation_loop(orientation_tx));

    let status_path = format!("{}/live_status.json", args.output_dir);
    let mut session = Session::start(
        EstimatorConfig::default(),
        node_id,
        SensorFeeds { location_rx, motion_rx, orientation_rx },
        Uploader::new(&args.server, args.api_key.clone()),
        Arc::new(platform::StderrNotificationSink),
        bucket_mode,
        Some(status_path),
    );

    if args.dashboard_port > 0 {
        tokio::spawn(dashboard::start_dashboard(
            session.shared_status(),
            args.dashboard_port,
        ));
    }

    println!("[{}] Session running...", ts_now());

    let start = Utc::now();
    let run_until_duration = async {
        loop {
            sleep(Duration::from_secs(1)).await;
            if args.duration > 0 {
                let elapsed = Utc::now().signed_duration_since(start);
                if elapsed.num_seconds() as u64 >= args.duration {
                    println!("[{}] Duration reached, stopping...", ts_now());
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = run_until_duration => {}
        _ = tokio::signal::ctrl_c() => {
            println!("[{}] Interrupted, stopping...", ts_now());
        }
    }

    if let Some(eval) = session.evaluate_now() {
        println!("\n=== Final State ===");
        println!("Mount: {}", eval.classification.mount_state.as_str());
        println!("Confidence: {:.4}", eval.scoring.confidence);
        println!("Quality: {}", eval.scoring.quality_note.as_str());
    }

    session.stop();
    println!("[{}] Session stopped", ts_now());

    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
