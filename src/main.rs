use refraction_engine::controller::ControllerEvent;
use refraction_engine::prelude::*;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Demo session: a -1.75 / -1.25 x 20 eye swept in 15° steps with small,
    // repeatable measurement noise and one misaligned reading.
    let truth = AstigmaticPrescription::new(-1.75, -1.25, 20.0);
    let device = DeviceCapabilities {
        name: "demo".to_string(),
        angle_step_deg: 15.0,
        default_start_power: -1.0,
        ..Default::default()
    };
    let patient = PatientProfile {
        current: Some(AstigmaticPrescription::new(-1.0, -0.5, 20.0)),
        using_glasses: true,
        usage: Usage::Both,
        age: 44,
    };
    let mut controller =
        AcquisitionController::new(device, EngineParams::default())?.with_patient(patient);
    let events = controller.subscribe();

    let mut step = 0u32;
    for bucket in 0..12 {
        let angle = bucket as f32 * 15.0;
        for repeat in 0..3 {
            let noise = 0.08 * ((step * 7 % 5) as f32 - 2.0) / 2.0;
            controller.add_result(angle + repeat as f32 * 0.5, truth.power_at(angle) + noise)?;
            step += 1;
        }
        if bucket == 3 {
            // Operator wobble: points at the next bucket without moving.
            controller.add_result(angle + 4.0, truth.power_at(angle))?;
        }
    }

    let computed = controller.computed();
    println!("truth:    {truth}");
    println!(
        "readings: {} (failures {})",
        computed.len(),
        computed.failures()
    );
    for event in events.try_iter() {
        if let ControllerEvent::Completed {
            tested,
            rounded,
            accepted,
        } = event
        {
            println!("completed after {tested} meridians");
            println!("rounded:  {}", fmt(rounded));
            println!("accepted: {}", fmt(accepted));
        }
    }
    if !controller.check_if_done() {
        println!("session incomplete; rounded: {}", fmt(controller.update_fit_and_round()));
    }
    Ok(())
}

fn fmt(rx: Option<AstigmaticPrescription>) -> String {
    rx.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
}
