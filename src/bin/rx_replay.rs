use refraction_engine::config::replay::{self, OutputFormat, ReplayStep};
use refraction_engine::controller::{report_without_run, SampleOutcome};
use refraction_engine::io::{save_record, write_json_file};
use refraction_engine::{AcquisitionController, AcquisitionState, RefractionReport};
use std::env;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn usage() -> String {
    "Usage: rx_replay <config.json>".to_string()
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = replay::load_config(Path::new(&config_path))?;

    let mut controller = AcquisitionController::new(config.device.clone(), config.params.clone())
        .map_err(|e| format!("Failed to create controller: {e}"))?;
    controller.set_patient(config.patient.clone());

    let mut counts = StepCounts::default();
    for (idx, step) in config.steps.iter().enumerate() {
        match *step {
            ReplayStep::Sample { angle, power } => {
                let outcome = controller
                    .add_result(angle, power)
                    .map_err(|e| format!("Step {idx}: {e}"))?;
                counts.add(outcome);
            }
            ReplayStep::WorkingMeridian { working_meridian } => {
                controller
                    .set_working_meridian(working_meridian)
                    .map_err(|e| format!("Step {idx}: {e}"))?;
            }
        }
    }

    let finished = controller.state() == AcquisitionState::Finished;
    let report = if !finished && config.finalize {
        match &config.patient {
            Some(patient) => {
                controller.update_fit_and_acceptance(patient);
                last_report(&controller)
            }
            None => controller.update_fit_and_round_with_diagnostics(),
        }
    } else if controller.last_trace().is_some() {
        last_report(&controller)
    } else {
        report_without_run(&controller.computed())
    };

    let format = config.output.format;
    if format.includes_text() {
        println!("Replay summary ({})", config.device.name);
        println!(
            "  steps={} recorded={} entered={} failures={} ignored={}",
            config.steps.len(),
            counts.recorded,
            counts.entered,
            counts.failures,
            counts.ignored
        );
        println!(
            "  tested={}/{} finished={}",
            controller.tested_buckets().len(),
            controller.number_of_meridians_required_to_complete(),
            finished
        );
        for line in report.summary().lines() {
            println!("  {line}");
        }
    }

    if format.includes_json() {
        if let Some(path) = &config.output.json_out {
            write_json_file(path, &report)?;
            if format == OutputFormat::Both {
                println!("\nJSON report written to {}", path.display());
            } else {
                println!("JSON report written to {}", path.display());
            }
        } else {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| format!("Failed to serialize JSON: {e}"))?;
            if format == OutputFormat::Both {
                println!("\nJSON report:\n{json}");
            } else {
                println!("{json}");
            }
        }
    }

    if let Some(path) = &config.output.record_out {
        save_record(path, &controller.computed())?;
        if format.includes_text() {
            println!("Record written to {}", path.display());
        } else {
            eprintln!("Record written to {}", path.display());
        }
    }

    Ok(())
}

fn last_report(controller: &AcquisitionController) -> RefractionReport {
    RefractionReport {
        record: controller.computed().snapshot(),
        trace: controller.last_trace().cloned().unwrap_or_default(),
    }
}

#[derive(Default)]
struct StepCounts {
    recorded: usize,
    entered: usize,
    failures: usize,
    ignored: usize,
}

impl StepCounts {
    fn add(&mut self, outcome: SampleOutcome) {
        match outcome {
            SampleOutcome::Recorded { .. } => self.recorded += 1,
            SampleOutcome::Entered { .. } => self.entered += 1,
            SampleOutcome::Failure => self.failures += 1,
            SampleOutcome::Ignored => self.ignored += 1,
        }
    }
}
