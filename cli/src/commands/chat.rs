//! Interactive conversation command

use super::open_service;
use crate::output::{print_outcome, spinner};
use anyhow::Result;
use colored::Colorize;
use dialoguer::Input;
use taike_core::config::AppConfig;
use taike_core::GenAiService;
use tracing::debug;

/// One line typed at the chat prompt
#[derive(Debug, PartialEq)]
enum ChatInput {
    Empty,
    Quit,
    Clear,
    Settings { temperature: f32, max_new_tokens: u32 },
    Question(String),
    Invalid(String),
}

impl ChatInput {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if !line.starts_with('/') {
            return Self::Question(line.to_string());
        }

        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("/quit") | Some("/exit") => Self::Quit,
            Some("/clear") => Self::Clear,
            Some("/settings") => {
                let temperature = parts.next().and_then(|v| v.parse::<f32>().ok());
                let max_new_tokens = parts.next().and_then(|v| v.parse::<u32>().ok());
                match (temperature, max_new_tokens) {
                    (Some(temperature), Some(max_new_tokens))
                        if (0.0..=2.0).contains(&temperature) && max_new_tokens > 0 =>
                    {
                        Self::Settings {
                            temperature,
                            max_new_tokens,
                        }
                    }
                    _ => Self::Invalid("usage: /settings <temperature 0-2> <max_tokens>".to_string()),
                }
            }
            Some(other) => Self::Invalid(format!("unknown command: {}", other)),
            None => Self::Empty,
        }
    }
}

/// Start an interactive conversation
pub async fn chat_command(config: AppConfig) -> Result<()> {
    let service = open_service(config)?;
    tokio::task::spawn_blocking(move || chat_loop(service)).await?
}

fn chat_loop(mut service: GenAiService) -> Result<()> {
    println!("{}", "tAIke 아동복지 상담".bold());
    println!(
        "{}\n",
        "/settings <temperature> <max_tokens>, /clear, /quit".dimmed()
    );

    loop {
        let line: String = Input::new()
            .with_prompt("질문")
            .allow_empty(true)
            .interact_text()?;

        match ChatInput::parse(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Clear => {
                service.clear_memory();
                println!("{}", "대화 기록을 지웠습니다.".dimmed());
            }
            ChatInput::Settings {
                temperature,
                max_new_tokens,
            } => {
                service.update_settings(temperature, max_new_tokens);
                println!("{}", "설정 변경 완료".dimmed());
            }
            ChatInput::Invalid(message) => println!("{}", message.red()),
            ChatInput::Question(question) => {
                let bar = spinner("답변 생성 중...");
                let result = service.answer_question(&question);
                bar.finish_and_clear();
                match result {
                    Ok(outcome) => {
                        print_outcome(&outcome, false);
                        debug!("Memory holds {} exchange(s)", service.memory().len());
                    }
                    Err(e) => println!("{}", format!("오류: {}", e).red()),
                }
                println!();
            }
        }
    }

    Ok(())
}
