//! Drone 命令行入口
//!
//! 子命令：ask（单次 ReAct）、chat（交互式对话）、card（组件回复）、objective（任务队列，Ctrl+C 结束）。

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use drone::core::{create_agent_builder, AgentComponents, Executor};
use drone::observability::{self, EngineEvent, EventSink};
use drone::Agent;

const DEFAULT_OBJECTIVE: &str =
    "I want to acquire as many water balloons filled with Jello as possible, I am starting with $100.";
const DEFAULT_FIRST_TASK: &str =
    "Its probably a good idea to figure out where to store a bunch of water balloons filled with Jello...";

#[derive(Parser)]
#[command(name = "drone", version, about = "Reason-Act agent and objective-driven task queue")]
struct Cli {
    /// 配置文件路径（TOML）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 将引擎事件以 JSON 行输出到 stderr
    #[arg(long, global = true)]
    events: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask one question and print the answer.
    Ask { question: String },
    /// Interactive chat; `/reset` clears the conversation, `/exit` quits.
    Chat,
    /// Ask one question and print a reply with a card component as JSON.
    Card { question: String },
    /// Pursue an objective with the task queue (runs until the queue empties).
    Objective {
        #[arg(short, long, default_value = DEFAULT_OBJECTIVE)]
        objective: String,
        #[arg(short = 'f', long, default_value = DEFAULT_FIRST_TASK)]
        first_task: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init();
    let cli = Cli::parse();

    let mut builder =
        create_agent_builder(cli.config.clone()).context("failed to load configuration")?;
    if cli.events {
        builder = builder.with_events(spawn_event_printer());
    }
    let components = builder.build_components();

    let outcome = match cli.command {
        Command::Ask { question } => ask(components.react_engine(), &question).await,
        Command::Chat => chat(&components).await,
        Command::Card { question } => ask(components.component_engine(), &question).await,
        Command::Objective {
            objective,
            first_task,
        } => run_objective(&components, &objective, &first_task).await,
    };
    report_token_usage(&components);
    outcome
}

/// 失败时也输出已消耗的 token
fn report_token_usage(components: &AgentComponents) {
    let (prompt, completion, total) = components.llm.token_usage();
    tracing::info!(
        prompt_tokens = prompt,
        completion_tokens = completion,
        total_tokens = total,
        "token usage"
    );
}

fn spawn_event_printer() -> EventSink {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<EngineEvent>();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Ok(line) = serde_json::to_string(&event) {
                eprintln!("{}", line);
            }
        }
    });
    EventSink::new(tx)
}

async fn ask<E: Executor>(engine: E, question: &str) -> Result<()> {
    let mut agent = Agent::new(engine);
    match agent.add_message(question).await {
        Some(answer) => {
            println!("{}", answer);
            Ok(())
        }
        None => bail!("the agent could not produce an answer (see logs)"),
    }
}

async fn chat(components: &AgentComponents) -> Result<()> {
    let mut agent = Agent::new(components.react_engine());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Chat started. Type /reset to clear the conversation, /exit to quit.");
    while let Some(line) = lines.next_line().await.context("read stdin")? {
        let input = line.trim();
        match input {
            "" => continue,
            "/exit" | "/quit" => break,
            "/reset" => println!("{}", agent.reset()),
            _ => match agent.add_message(input).await {
                Some(answer) => println!("{}", answer),
                None => println!("(no answer, see logs)"),
            },
        }
    }
    Ok(())
}

async fn run_objective(components: &AgentComponents, objective: &str, first_task: &str) -> Result<()> {
    println!("Using objective: {}", objective);
    println!("Using first task: {}", first_task);
    println!("Starting task queue. Kill it with Ctrl+C.");

    let mut engine = components.task_queue_engine(objective);
    let result = engine
        .call(first_task)
        .await
        .context("task queue aborted")?;
    println!(
        "Task queue is empty after {} completed tasks. Last result:\n{}",
        engine.completed_tasks().len(),
        result
    );
    Ok(())
}
