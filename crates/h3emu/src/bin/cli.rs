use clap::Parser;
use h3emu::{Args, Machine, StopReason, load_kernel_data};
use tracing::info;

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load the kernel image
    let kernel = match load_kernel_data(&args) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to load kernel image: {}", e);
            std::process::exit(2);
        }
    };

    // Create machine config from args
    let config = args.to_machine_config();

    // Create the machine
    let mut machine = match Machine::new(&kernel, config) {
        Ok(machine) => machine,
        Err(e) => {
            eprintln!("Failed to create machine: {}", e);
            std::process::exit(2);
        }
    };

    info!("Kernel entry: {:#X}", machine.pc());

    // Run the machine
    info!("=== Running Machine (Headless) ===");
    let stop_reason = machine.run();

    // Log final state
    info!("=== Emulation Complete ===");
    info!("Stop reason: {:?}", stop_reason);
    machine.print_final_state();

    // Determine exit code based on stop reason and whether expectations were met
    let exit_code = match stop_reason {
        StopReason::Error(msg) => {
            eprintln!("Machine error: {}", msg);
            2
        }
        StopReason::Timeout => {
            eprintln!("Timeout reached before stop conditions met");
            1
        }
        StopReason::StopCondition => {
            let pc_ok = args
                .stop_pc
                .is_none_or(|expected| machine.cpu_stopped() && machine.pc() == expected);

            if pc_ok {
                info!("PASS: All stop conditions reached");
                0
            } else {
                // This means max_instructions was hit before the PC was reached
                eprintln!(
                    "CPU did not reach expected PC {:#X} (actual: {:#X}, stopped: {})",
                    args.stop_pc.unwrap_or(0),
                    machine.pc(),
                    machine.cpu_stopped()
                );
                1
            }
        }
    };

    std::process::exit(exit_code);
}
