//! Interactive chat loop.
//!
//! One turn at a time: input is read only after the previous turn finished. Ctrl-C
//! while a turn is in flight cancels that turn; Ctrl-C at the prompt exits.

use super::output::Output;
use crate::dispatch::{DispatchController, DispatchPolicy, Session, TurnOutcome};
use crate::research::ResearchProgress;
use crate::utils::ConfigManager;
use std::future::Future;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Slash commands understood by the chat loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Research,
    Reset,
    Intent,
    Image(PathBuf),
    Help,
    Quit,
    Unknown(String),
}

/// `None` for ordinary chat input
pub fn parse_command(input: &str) -> Option<ReplCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    Some(match name {
        "research" => ReplCommand::Research,
        "reset" => ReplCommand::Reset,
        "intent" => ReplCommand::Intent,
        "image" if !arg.is_empty() => ReplCommand::Image(PathBuf::from(arg)),
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(input.to_string()),
    })
}

/// Drive one turn to completion, rendering progress as it arrives. Ctrl-C cancels
/// the turn and waits for it to unwind.
pub async fn drive<F>(
    turn: F,
    cancel: &CancellationToken,
    progress: &mut UnboundedReceiver<ResearchProgress>,
    output: Output,
) -> TurnOutcome
where
    F: Future<Output = TurnOutcome>,
{
    tokio::pin!(turn);
    let mut interrupted = false;

    let outcome = loop {
        tokio::select! {
            outcome = &mut turn => break outcome,
            Some(event) = progress.recv() => output.progress(&event),
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                debug!("Ctrl-C: cancelling turn");
                interrupted = true;
                cancel.cancel();
            }
        }
    };

    while let Ok(event) = progress.try_recv() {
        output.progress(&event);
    }
    outcome
}

pub fn render(output: Output, session: &Session, outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Reply(text) | TurnOutcome::Apology(text) => output.assistant(session.state, text),
        TurnOutcome::Report(report) => output.report(report),
        TurnOutcome::Silent => {}
        TurnOutcome::Cancelled => output.warning("요청이 취소되었습니다."),
    }
}

pub struct Repl {
    controller: DispatchController,
    config: ConfigManager,
    output: Output,
    progress: UnboundedReceiver<ResearchProgress>,
}

impl Repl {
    pub fn new(
        controller: DispatchController,
        config: ConfigManager,
        output: Output,
        progress: UnboundedReceiver<ResearchProgress>,
    ) -> Self {
        Self {
            controller,
            config,
            output,
            progress,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let output = self.output;
        output.banner();
        output.hint("/research 로 바로 리서치, /intent 로 현재 의도 확인, /quit 로 종료");

        let mut session = self.controller.open_session().await;

        let cancel = CancellationToken::new();
        let outcome = drive(
            self.controller.boot(&mut session, &cancel),
            &cancel,
            &mut self.progress,
            output,
        )
        .await;
        render(output, &session, &outcome);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            output.prompt(&session.addressing());

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                output.newline();
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            // Pick up hot-reloaded gating settings
            self.controller
                .set_policy(DispatchPolicy::from_config(&self.config.config().dispatch));

            let cancel = CancellationToken::new();
            let outcome = match parse_command(input) {
                Some(ReplCommand::Quit) => break,
                Some(ReplCommand::Help) => {
                    self.help();
                    continue;
                }
                Some(ReplCommand::Intent) => {
                    output.intent(&session.intent);
                    continue;
                }
                Some(ReplCommand::Reset) => {
                    match self.controller.reset_intent(&mut session).await {
                        Ok(()) => output.success("세션과 의도 기록을 초기화했습니다."),
                        Err(e) => output.error(&format!("초기화 실패: {}", e)),
                    }
                    continue;
                }
                Some(ReplCommand::Unknown(cmd)) => {
                    output.warning(&format!("알 수 없는 명령: {}", cmd));
                    continue;
                }
                Some(ReplCommand::Research) => {
                    drive(
                        self.controller.research_now(&mut session, &cancel),
                        &cancel,
                        &mut self.progress,
                        output,
                    )
                    .await
                }
                Some(ReplCommand::Image(path)) => {
                    let Some(mime) = super::mime_from_path(&path) else {
                        output.warning("지원하지 않는 이미지 형식입니다.");
                        continue;
                    };
                    let bytes = match tokio::fs::read(&path).await {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            warn!("Failed to read {}: {}", path.display(), e);
                            output.error(&format!("{} 을(를) 읽을 수 없습니다: {}", path.display(), e));
                            continue;
                        }
                    };
                    drive(
                        self.controller.describe_image(&mut session, &bytes, &mime, &cancel),
                        &cancel,
                        &mut self.progress,
                        output,
                    )
                    .await
                }
                None => {
                    drive(
                        self.controller.handle_turn(&mut session, input, &cancel),
                        &cancel,
                        &mut self.progress,
                        output,
                    )
                    .await
                }
            };

            render(output, &session, &outcome);
        }

        self.config.stop_watching();
        Ok(())
    }

    fn help(&self) {
        let output = self.output;
        output.header("Commands");
        output.kv("/research", "지금까지의 대화로 바로 리서치 실행");
        output.kv("/intent", "현재 의도 기록 보기");
        output.kv("/reset", "대화와 의도 기록 초기화");
        output.kv("/image <path>", "이미지 분석 후 리서치 맥락으로 사용");
        output.kv("/quit", "종료");
        output.hint("Ctrl-C 로 진행 중인 요청을 취소할 수 있습니다");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/research", Some(ReplCommand::Research))]
    #[case("  /reset ", Some(ReplCommand::Reset))]
    #[case("/intent", Some(ReplCommand::Intent))]
    #[case("/image ./dog.png", Some(ReplCommand::Image(PathBuf::from("./dog.png"))))]
    #[case("/image", Some(ReplCommand::Unknown("/image".to_string())))]
    #[case("/q", Some(ReplCommand::Quit))]
    #[case("/dance", Some(ReplCommand::Unknown("/dance".to_string())))]
    #[case("연구 시작", None)]
    #[case("반가워요 /research", None)]
    fn test_parse_command(#[case] input: &str, #[case] expected: Option<ReplCommand>) {
        assert_eq!(parse_command(input), expected);
    }

    #[tokio::test]
    async fn test_drive_renders_buffered_progress() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let turn = async move {
            tx.send(ResearchProgress::Searching).unwrap();
            tx.send(ResearchProgress::Completed).unwrap();
            TurnOutcome::Silent
        };

        let outcome = drive(turn, &cancel, &mut rx, Output::no_color()).await;
        assert_eq!(outcome, TurnOutcome::Silent);
        assert!(rx.try_recv().is_err());
        assert!(!cancel.is_cancelled());
    }
}
