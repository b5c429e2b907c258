use std::io::{self, Write};
use std::time::Duration;

use keepsake_core::proposal::{
    Position, Proposal, ProposalScript, ProposalStage, ProposalState, ProposalTimings, Size,
};
use keepsake_core::routes::Route;
use keepsake_core::ui::Typewriter;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::commands::common::{open_context, require_page};
use crate::error::CliError;
use crate::prompts::is_yes;

/// Terminal cells standing in for the answer area and the "No" button.
const ANSWER_AREA: Size = Size {
    width: 60.0,
    height: 10.0,
};
const NO_BUTTON: Size = Size {
    width: 6.0,
    height: 1.0,
};
const MAX_HEARTS_SHOWN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Unclear,
}

pub fn parse_answer(input: &str) -> Answer {
    if is_yes(input) {
        Answer::Yes
    } else if matches!(input.trim().to_ascii_lowercase().as_str(), "n" | "no") {
        Answer::No
    } else {
        Answer::Unclear
    }
}

/// Timings with every delay set to zero.
pub const fn instant_timings() -> ProposalTimings {
    ProposalTimings {
        letter_char_delay: Duration::ZERO,
        letter_pause: Duration::ZERO,
        question_char_delay: Duration::ZERO,
        question_pause: Duration::ZERO,
        burst_linger: Duration::ZERO,
        final_burst_linger: Duration::ZERO,
    }
}

pub fn hearts_line(state: &ProposalState) -> String {
    "♥ ".repeat(state.hearts.len().min(MAX_HEARTS_SHOWN))
        .trim_end()
        .to_string()
}

pub async fn run_proposal(instant: bool, global_profile: Option<&str>) -> Result<(), CliError> {
    let context = open_context(global_profile).await?;
    let user = require_page(Route::Proposal, &context.session)?;

    let timings = if instant {
        instant_timings()
    } else {
        ProposalTimings::default()
    };
    let script = ProposalScript::default();
    let mut proposal = Proposal::new(script.clone(), timings);
    let mut states = proposal.subscribe();
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", script.heading);
    println!("Press Enter to open the letter, {}.", user.display_name());
    if input.next_line().await?.is_none() {
        return Ok(());
    }

    proposal.open();
    println!("{}\n", hearts_line(&proposal.snapshot()));
    type_out(&script.letter, timings.letter_char_delay).await?;

    if !wait_for_stage(&mut states, ProposalStage::QuestionRevealed).await {
        return Ok(());
    }
    println!("{}", hearts_line(&proposal.snapshot()));
    type_out(&script.question, timings.question_char_delay).await?;

    if !wait_for_stage(&mut states, ProposalStage::ChoiceOffered).await {
        return Ok(());
    }

    loop {
        print!("[yes / no] ");
        io::stdout().flush()?;
        let Some(line) = input.next_line().await? else {
            break;
        };
        match parse_answer(&line) {
            Answer::Yes => {
                proposal.choose_yes();
                println!("\n{}", hearts_line(&proposal.snapshot()));
                println!("{}", script.celebration);
                break;
            }
            Answer::No => {
                if let Some(position) = proposal.choose_no(ANSWER_AREA, NO_BUTTON) {
                    println!("{}", describe_dodge(position));
                }
            }
            Answer::Unclear => println!("Answer yes or no."),
        }
    }

    proposal.teardown();
    Ok(())
}

pub fn describe_dodge(position: Position) -> String {
    format!(
        "The \"No\" button slipped away to column {:.0}, row {:.0}. Try again?",
        position.x, position.y
    )
}

async fn type_out(text: &str, delay: Duration) -> io::Result<()> {
    let typewriter = Typewriter::new(text, delay);
    let mut stdout = io::stdout();
    let mut shown = 0;
    let mut result = Ok(());
    typewriter
        .play(|frame| {
            if result.is_ok() {
                result = stdout
                    .write_all(&frame.as_bytes()[shown..])
                    .and_then(|()| stdout.flush());
            }
            shown = frame.len();
        })
        .await;
    result?;
    println!();
    Ok(())
}

/// Wait until the sequencer has reached `stage` or moved past it.
pub async fn wait_for_stage(
    states: &mut watch::Receiver<ProposalState>,
    stage: ProposalStage,
) -> bool {
    states.wait_for(|state| state.stage >= stage).await.is_ok()
}
