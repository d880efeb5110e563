use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use omnipilot::agent_engine::engine::{AgentLoop, LoopConfig};
use omnipilot::config::{self, AppConfig};
use omnipilot::errors::OmniPilotResult;
use omnipilot::executor::input::EnigoDriver;
use omnipilot::llm::openai::OpenAiCompatibleClient;
use omnipilot::llm::provider::{PlanningProvider, VisionLocator};
use omnipilot::narration::{Narrator, NullNarrator, SpeechNarrator};
use omnipilot::perception::engine::PerceptionEngine;
use omnipilot::perception::screenshot::{primary_scale_factor, ScreenCapturer};
use omnipilot::perception::traits::TextRecognizer;

#[tokio::main]
async fn main() -> OmniPilotResult<()> {
    omnipilot::init_tracing();
    let _ = dotenvy::dotenv();

    let config = config::load_config().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "no usable config.toml, running with defaults");
        AppConfig::default()
    });

    let client = OpenAiCompatibleClient::from_config(&config.llm).map(Arc::new);
    if client.is_none() {
        tracing::warn!(
            "no API key found (config, OMNIPILOT_API_KEY, OPENAI_API_KEY); \
             the planner is unconfigured and every step will report an error"
        );
    }
    let planner = client.clone().map(|c| c as Arc<dyn PlanningProvider>);
    let locator = client.map(|c| c as Arc<dyn VisionLocator>);

    let recognizer = build_recognizer();
    let scale = primary_scale_factor()?;
    tracing::info!(scale, "display scale factor cached");
    let perception = PerceptionEngine::new(recognizer, locator, scale);

    let input = Arc::new(EnigoDriver::new()?);
    let narrator: Arc<dyn Narrator> = if config.agent.narration {
        Arc::new(SpeechNarrator::new())
    } else {
        Arc::new(NullNarrator)
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = interrupted.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping at next iteration boundary");
                flag.store(true, Ordering::SeqCst);
            }
        });
    }

    let goal = prompt_for_goal()?;
    if goal.is_empty() {
        tracing::info!("no goal given, exiting");
        return Ok(());
    }

    let loop_config = LoopConfig {
        max_iterations: config.agent.max_iterations,
        max_consecutive_failures: config.agent.max_consecutive_failures,
        ..LoopConfig::default()
    };

    let mut agent = AgentLoop::new(
        Arc::new(ScreenCapturer::new()),
        perception,
        planner,
        input,
        narrator,
        loop_config,
        interrupted,
    );
    let outcome = agent.run(&goal).await?;
    tracing::info!(?outcome, "exiting");
    Ok(())
}

#[cfg(feature = "ocr")]
fn build_recognizer() -> Option<Arc<dyn TextRecognizer>> {
    Some(Arc::new(omnipilot::perception::ocr::TesseractRecognizer::default()))
}

#[cfg(not(feature = "ocr"))]
fn build_recognizer() -> Option<Arc<dyn TextRecognizer>> {
    tracing::info!("built without the `ocr` feature; scans yield no elements and clicks rely on the vision fallback");
    None
}

fn prompt_for_goal() -> OmniPilotResult<String> {
    print!("What should I do? > ");
    std::io::stdout().flush()?;
    let mut goal = String::new();
    std::io::stdin().read_line(&mut goal)?;
    Ok(goal.trim().to_string())
}
