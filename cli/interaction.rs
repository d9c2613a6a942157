use anyhow::Result;
use console::{Term, style};
use dialoguer::Confirm;
use std::io::{self, IsTerminal};
use tabspace_core::ConversionRule;

// The prompt is drawn on stderr and answered on stdin.
fn attended() -> bool {
    Term::stderr().is_term() && io::stdin().is_terminal()
}

pub fn confirm_processing(
    file_count: usize,
    rule: ConversionRule,
    no_confirm: bool,
) -> Result<bool> {
    if no_confirm {
        return Ok(true);
    }
    if file_count == 0 {
        println!("No files to process.");
        return Ok(false);
    }

    if !attended() {
        tracing::debug!("no terminal attached, proceeding without confirmation");
        return Ok(true);
    }

    let prompt = format!(
        "Convert {} files to the {} rule?",
        style(file_count).cyan(),
        style(rule).cyan()
    );

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    if !confirmed {
        println!("Aborted by user.");
    }

    Ok(confirmed)
}
