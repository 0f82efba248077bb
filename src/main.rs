use anyhow::Context;
use delivery_gate::core::error::GateError;
use std::process::ExitCode;

fn main() -> ExitCode {
    let result = delivery_gate::run().context("delivery-gate");
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let blocked = err
                .downcast_ref::<GateError>()
                .is_some_and(GateError::is_blocked);
            eprintln!("{:#}", err);
            // 1: the gate ran and blocked release. 2: the gate could not run.
            ExitCode::from(if blocked { 1 } else { 2 })
        }
    }
}
