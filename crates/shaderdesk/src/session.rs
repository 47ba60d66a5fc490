//! Interactive two-panel session.
//!
//! One loop, two inbound channels: stdin lines typed by the user and
//! completion events sent back by generation worker threads. Lines become
//! events, events run through [`SessionState::apply`], and the returned
//! commands are executed here — evaluation and rendering synchronously on the
//! loop thread, generation on a detached worker so a slow service never
//! blocks the calculator panel.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use evaluator::Evaluator;
use renderer::RenderPipeline;
use shadergen::ShaderProvider;
use tracing::debug;

use crate::state::{CalcResult, Command, Event, GenerationOutcome, SessionState};

pub struct Session {
    state: SessionState,
    evaluator: Evaluator,
    provider: ShaderProvider,
    pipeline: RenderPipeline,
    events: Sender<Event>,
}

impl Session {
    pub fn new(
        evaluator: Evaluator,
        provider: ShaderProvider,
        pipeline: RenderPipeline,
        events: Sender<Event>,
    ) -> Self {
        Self {
            state: SessionState::default(),
            evaluator,
            provider,
            pipeline,
            events,
        }
    }

    /// Maps one input line to events/actions. Returns `false` on quit.
    fn handle_line(&mut self, line: &str) -> bool {
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        match verb {
            "" => {}
            "expr" => self.dispatch(Event::EditExpression(rest.to_string())),
            "calc" => {
                if !rest.is_empty() {
                    self.dispatch(Event::EditExpression(rest.to_string()));
                }
                self.dispatch(Event::Calculate);
            }
            "desc" => self.dispatch(Event::EditDescription(rest.to_string())),
            "gen" => {
                if !rest.is_empty() {
                    self.dispatch(Event::EditDescription(rest.to_string()));
                }
                self.dispatch(Event::GenerateShader);
            }
            "export" => self.export(rest),
            "show" => self.print_panels(),
            "help" => print_help(),
            "quit" | "exit" => return false,
            other => println!("unknown command '{other}'; try 'help'"),
        }
        true
    }

    fn dispatch(&mut self, event: Event) {
        let announce = matches!(
            event,
            Event::CalculationCompleted(_)
                | Event::GenerationCompleted { .. }
                | Event::RenderCompleted { .. }
        );
        if let Some(command) = self.state.apply(event) {
            self.execute(command);
        }
        if announce {
            self.print_panels();
        }
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Evaluate { expression } => {
                let result = match self.evaluator.evaluate(&expression) {
                    Ok(value) => CalcResult::Value(value),
                    Err(err) => CalcResult::Error(err.to_string()),
                };
                self.dispatch(Event::CalculationCompleted(result));
            }
            Command::Generate {
                request,
                description,
            } => {
                let provider = self.provider.clone();
                let events = self.events.clone();
                debug!(request, "spawning generation worker");
                thread::spawn(move || {
                    let outcome = match provider.provide(&description) {
                        Ok(shader) => GenerationOutcome::Generated {
                            source: shader.source,
                            origin: shader.origin,
                        },
                        Err(err) => GenerationOutcome::Failed {
                            message: err.to_string(),
                        },
                    };
                    // The session may already be gone; a dead channel is fine.
                    let _ = events.send(Event::GenerationCompleted { request, outcome });
                });
            }
            Command::Render { request, source } => {
                let outcome = self.pipeline.render(&source);
                self.dispatch(Event::RenderCompleted { request, outcome });
            }
        }
    }

    fn export(&self, rest: &str) {
        if rest.is_empty() {
            println!("usage: export <path.png>");
            return;
        }
        match self.pipeline.export_png(&PathBuf::from(rest)) {
            Ok(()) => println!("wrote {rest}"),
            Err(err) => println!("export failed: {err:#}"),
        }
    }

    fn print_panels(&self) {
        match &self.state.result {
            Some(CalcResult::Value(value)) => println!("calculator: {value}"),
            Some(CalcResult::Error(message)) => println!("calculator: error: {message}"),
            None => {}
        }
        if self.state.pending() {
            println!("shader: generation pending");
        }
        if let Some(error) = &self.state.shader_error {
            println!("shader: {error}");
        }
        if let Some(source) = &self.state.shader_source {
            println!("shader source:\n{source}");
        }
    }
}

pub fn run_session(
    evaluator: Evaluator,
    provider: ShaderProvider,
    pipeline: RenderPipeline,
) -> Result<()> {
    let (event_tx, event_rx) = unbounded::<Event>();
    let stdin_rx = spawn_stdin_reader();
    let mut session = Session::new(evaluator, provider, pipeline, event_tx);

    print_help();
    loop {
        crossbeam_channel::select! {
            recv(stdin_rx) -> line => match line {
                Ok(line) => {
                    if !session.handle_line(line.trim()) {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(event_rx) -> event => match event {
                Ok(event) => session.dispatch(event),
                Err(_) => break,
            },
        }
    }
    Ok(())
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

fn print_help() {
    println!("commands:");
    println!("  expr <text>    set the calculator expression");
    println!("  calc [text]    evaluate the (given or current) expression");
    println!("  desc <text>    set the shader description");
    println!("  gen [text]     request a shader for the (given or current) description");
    println!("  export <path>  write the last rendered frame as PNG");
    println!("  show           print both panels");
    println!("  quit           leave the session");
}
