use std::io::BufRead;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::{info, warn};

use micdio::{AppConfig, BoardDescriptor, GpioController, Panel, Snapshot, SysfsBackend};

enum Command {
    Toggle(usize),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    match line {
        "q" | "quit" => Some(Command::Quit),
        _ => {
            let token = line.strip_prefix("t ").unwrap_or(line);
            token.parse().ok().map(Command::Toggle)
        }
    }
}

fn print_snapshot(snapshot: &Snapshot) {
    let outputs: Vec<String> = snapshot.outputs.iter().map(|l| l.to_string()).collect();
    let inputs: Vec<String> = snapshot.inputs.iter().map(|l| l.to_string()).collect();
    println!("out [{}]  in [{}]", outputs.join(" "), inputs.join(" "));
}

fn main() {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MICDIO_CONFIG").ok());
    let config = match config_path {
        Some(path) => AppConfig::load_from_file(&path)
            .unwrap_or_else(|e| panic!("Failed to load config: {e}")),
        None => AppConfig::default(),
    };

    let descriptor = BoardDescriptor::detect(&config.descriptor_path)
        .unwrap_or_else(|e| panic!("Failed to identify board: {e}"));
    info!("Detected {} (BSP {})", descriptor.model, descriptor.bsp);

    let backend = Arc::new(SysfsBackend::new(&config.gpio_root));
    let mut controller = GpioController::new(descriptor.model, backend);
    controller
        .export()
        .unwrap_or_else(|e| panic!("Failed to claim GPIO lines: {e}"));
    let panel = Panel::new(controller, Duration::from_millis(config.poll_interval_ms));

    let layout = panel.pin_layout();
    println!("{} GPIO panel (BSP {})", layout.model, descriptor.bsp);
    println!("outputs: {:?}", layout.outputs);
    println!("inputs:  {:?}", layout.inputs);
    println!("commands: t <slot> toggles an output, q quits");

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(Command::Quit) => break,
                Some(command) => {
                    if tx.send(command).is_err() {
                        return;
                    }
                }
                None => println!("unrecognized command: {line}"),
            }
        }
        let _ = tx.send(Command::Quit);
    });

    let mut last: Option<Snapshot> = None;
    loop {
        match rx.recv_timeout(panel.poll_interval()) {
            Ok(Command::Toggle(slot)) => match panel.request_change(slot) {
                Ok(level) => println!("output {slot} -> {level}"),
                Err(e) => warn!("change request for slot {slot}: {e}"),
            },
            Ok(Command::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        match panel.snapshot() {
            Ok(snapshot) => {
                if last.as_ref() != Some(&snapshot) {
                    print_snapshot(&snapshot);
                    last = Some(snapshot);
                }
            }
            Err(e) => warn!("refresh: {e}"),
        }
    }

    if panel.release().is_empty() {
        info!("released all GPIO lines");
    }
}
