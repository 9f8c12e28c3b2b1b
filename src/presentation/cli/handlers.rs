//! Command handlers
//!
//! Each handler returns the process exit code.

use anyhow::{Context, Result};
use linha_core::{DigitLine, ReadSource, extract};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::commands::{Cli, Commands};
use super::console::{ConsoleEvent, ConsoleListener};
use crate::application::dto::SessionOptions;
use crate::application::{AcquisitionService, AcquisitionState, SessionControl, evaluate_read};
use crate::domain::entities::SessionOutcome;
use crate::domain::repositories::PreprocessParams;
use crate::domain::services::{Attempt, OcrStrategy, RecognitionStrategy, Signal};
use crate::infrastructure::barcode::ZbarBarcodeDecoder;
use crate::infrastructure::capture::DirectoryCaptureDevice;
use crate::infrastructure::ocr::TesseractOcrEngine;
use crate::infrastructure::preprocessing::ImageCratePreprocessor;

#[derive(Serialize)]
struct CandidateReport<'a> {
    digits: &'a str,
    valid: bool,
}

#[derive(Serialize)]
struct ValidationReport {
    valid: bool,
    line: Option<DigitLine>,
    error: Option<String>,
}

pub async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Validate { line, json } => validate(&line, json),
        Commands::Extract { input, json } => extract_candidates(&input, json),
        Commands::Ocr {
            image,
            target_width,
            contrast,
            language,
            psm,
        } => {
            let params = PreprocessParams::default()
                .with_target_width(target_width)
                .with_contrast(contrast);
            let engine = TesseractOcrEngine::new(&language).with_page_segmentation(psm);
            recognize(&image, params, engine).await
        }
        Commands::Scan {
            frames,
            interval_ms,
            repeat,
            config,
            image,
            manual,
            language,
            psm,
            json,
        } => {
            let options = match config {
                Some(path) => SessionOptions::from_json_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => SessionOptions::default(),
            };
            let image = image
                .map(|path| {
                    fs::read(&path).with_context(|| format!("reading {}", path.display()))
                })
                .transpose()?;
            let mut device = DirectoryCaptureDevice::new(&frames)
                .with_interval(Duration::from_millis(interval_ms));
            if repeat {
                device = device.repeating();
            }
            let service = AcquisitionService::new(
                Arc::new(device),
                Arc::new(ZbarBarcodeDecoder::new()),
                Arc::new(ImageCratePreprocessor::new()),
                Arc::new(TesseractOcrEngine::new(&language).with_page_segmentation(psm)),
                options,
            )?;
            let outcome = scan(&service, image, manual).await;
            print_outcome(&outcome, json)?;
            Ok(outcome.exit_code())
        }
    }
}

fn validate(input: &str, json: bool) -> Result<i32> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    let parsed = digits.parse::<DigitLine>();

    if json {
        let report = match &parsed {
            Ok(line) => ValidationReport {
                valid: true,
                line: Some(line.clone()),
                error: None,
            },
            Err(e) => ValidationReport {
                valid: false,
                line: None,
                error: Some(e.to_string()),
            },
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &parsed {
            Ok(line) => println!("valid  {}", line.formatted()),
            Err(e) => println!("invalid  {e}"),
        }
    }

    Ok(if parsed.is_ok() { 0 } else { 1 })
}

fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        Ok(text)
    } else {
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))
    }
}

fn extract_candidates(input: &Path, json: bool) -> Result<i32> {
    let text = read_input(input)?;
    let candidates = extract(&text, ReadSource::Ocr, Instant::now());
    let reports: Vec<CandidateReport<'_>> = candidates
        .iter()
        .map(|c| CandidateReport {
            digits: c.digits(),
            valid: linha_core::validate(c.digits()),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else if reports.is_empty() {
        println!("no candidates");
    } else {
        for report in &reports {
            let mark = if report.valid { "valid" } else { "-" };
            println!("{:<7}{}", mark, report.digits);
        }
    }

    Ok(if reports.iter().any(|r| r.valid) { 0 } else { 1 })
}

async fn recognize(
    image: &Path,
    params: PreprocessParams,
    engine: TesseractOcrEngine,
) -> Result<i32> {
    params
        .validate()
        .context("invalid preprocessing parameters")?;
    let bytes = fs::read(image).with_context(|| format!("reading {}", image.display()))?;
    if !engine.is_available() {
        anyhow::bail!("tesseract is not installed or not on PATH");
    }

    let strategy = OcrStrategy::new(
        Arc::new(ImageCratePreprocessor::new()),
        Arc::new(engine),
        params,
    );
    let attempt =
        tokio::task::spawn_blocking(move || strategy.attempt(&Signal::Image(Arc::from(bytes))))
            .await
            .context("OCR task failed")?;

    let raw = match attempt {
        Attempt::Read(raw) => raw,
        Attempt::NoReadYet => {
            println!("no text recognized");
            return Ok(1);
        }
        Attempt::Failed(kind) => {
            println!("recognition failed: {kind}");
            return Ok(1);
        }
    };

    match evaluate_read(&raw) {
        Ok(line) => {
            println!("valid  {}", line.formatted());
            Ok(0)
        }
        Err(kind) => {
            println!("no valid line: {kind}");
            Ok(1)
        }
    }
}

/// Runs one session, feeding the fallback inputs when barcode scanning gives up
async fn scan(
    service: &AcquisitionService,
    image: Option<Vec<u8>>,
    manual: Option<String>,
) -> SessionOutcome {
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let session = service.start_session(ConsoleListener::new(events_tx));
    let control = session.control();

    drive_fallbacks(&control, &mut events, image, manual).await;
    session.join().await
}

async fn drive_fallbacks(
    control: &SessionControl,
    events: &mut mpsc::UnboundedReceiver<ConsoleEvent>,
    image: Option<Vec<u8>>,
    manual: Option<String>,
) {
    loop {
        match events.recv().await {
            None | Some(ConsoleEvent::State(AcquisitionState::Closed)) => return,
            Some(ConsoleEvent::State(
                AcquisitionState::OcrFallback | AcquisitionState::ManualFallback,
            )) => break,
            Some(_) => {}
        }
    }

    if let Some(bytes) = image {
        if control.submit_image(bytes).is_err() || !await_reply(events).await {
            return;
        }
    }
    if let Some(line) = manual {
        if control.submit_manual_entry(line).is_err() || !await_reply(events).await {
            return;
        }
    }
    // closed sessions reject the command, which is fine
    let _ = control.decline_manual_entry();
}

/// Waits for the session to answer a submission; `false` once it closed
async fn await_reply(events: &mut mpsc::UnboundedReceiver<ConsoleEvent>) -> bool {
    loop {
        match events.recv().await {
            None | Some(ConsoleEvent::State(AcquisitionState::Closed)) => return false,
            Some(ConsoleEvent::Notice(_)) => return true,
            Some(ConsoleEvent::State(_)) => {}
        }
    }
}

fn print_outcome(outcome: &SessionOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    match outcome {
        SessionOutcome::Success(line) => println!("valid  {}", line.formatted()),
        SessionOutcome::Failed(kind) => println!("failed  {kind}"),
        SessionOutcome::Cancelled => println!("cancelled"),
    }
    Ok(())
}
