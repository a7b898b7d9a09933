use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use stylist_live::audio::MicrophoneBackend;
use stylist_live::player::AudioSink;
use stylist_live::video::CameraBackend;
use stylist_live::{
    CaptureConfig, ChatClient, Config, JpegFileCamera, LiveSession, MockCamera, NullSink,
    WavFileMicrophone, WsConnector,
};

#[derive(Parser)]
#[command(
    name = "stylist-live",
    about = "Live voice/camera session client for the Stylist assistant backend"
)]
struct Cli {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/stylist-live")]
    config: String,

    /// Send one message over the HTTP chat fallback and exit
    #[arg(long)]
    chat: Option<String>,

    /// WAV file to replay as the microphone
    #[arg(long)]
    mic_file: Option<String>,

    /// JPEG file to serve as the camera
    #[arg(long)]
    camera_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Could not load {}: {}. Using defaults.", cli.config, e);
            Config::default()
        }
    };

    info!("{} starting", cfg.service.name);

    if let Some(message) = cli.chat {
        let client = ChatClient::new(&cfg.backend.http_url);
        let reply = client.send_message(&message).await;
        println!("{}", reply.response);
        return Ok(());
    }

    let capture = CaptureConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        ..CaptureConfig::default()
    };
    let microphone: Box<dyn MicrophoneBackend> = match &cli.mic_file {
        Some(path) => Box::new(WavFileMicrophone::new(path)),
        None => default_microphone(capture),
    };
    let camera: Box<dyn CameraBackend> = match &cli.camera_file {
        Some(path) => Box::new(JpegFileCamera::new(path)),
        None => {
            warn!("No camera backend on this platform; pass --camera-file to enable snapshots");
            Box::new(MockCamera::new())
        }
    };

    let session = LiveSession::new(
        cfg.session_config(),
        Arc::new(WsConnector),
        microphone,
        camera,
        default_sink(),
    );
    session.start().await;

    println!("Commands: record | stop | camera | snap | status | quit");
    println!("Anything else is sent to the assistant as text.");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = tokio::io::AsyncBufReadExt::lines(stdin);
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "quit" | "exit" => break,
            "record" => {
                if let Err(e) = session.record_start().await {
                    eprintln!("record: {}", e);
                }
            }
            "stop" => {
                if let Err(e) = session.record_stop().await {
                    eprintln!("stop: {}", e);
                }
            }
            "camera" => match session.camera_toggle().await {
                Ok(state) => println!("camera: {:?}", state),
                Err(e) => eprintln!("camera: {}", e),
            },
            "snap" => {
                if let Err(e) = session.send_snapshot().await {
                    eprintln!("snap: {}", e);
                }
            }
            "status" => {
                let stats = session.stats().await;
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
            text => session.submit_text(text).await,
        }
    }

    session.shutdown().await;
    Ok(())
}

#[cfg(feature = "devices")]
fn default_microphone(capture: CaptureConfig) -> Box<dyn MicrophoneBackend> {
    Box::new(stylist_live::audio::CpalMicrophone::new(capture))
}

#[cfg(not(feature = "devices"))]
fn default_microphone(_capture: CaptureConfig) -> Box<dyn MicrophoneBackend> {
    warn!("Built without the 'devices' feature; recordings will be empty. Pass --mic-file to replay a WAV.");
    Box::new(stylist_live::MockMicrophone::new())
}

#[cfg(feature = "devices")]
fn default_sink() -> Arc<dyn AudioSink> {
    match stylist_live::player::CpalSink::new() {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            warn!("No playback device ({}); responses will be text-only", e);
            Arc::new(NullSink)
        }
    }
}

#[cfg(not(feature = "devices"))]
fn default_sink() -> Arc<dyn AudioSink> {
    Arc::new(NullSink)
}
