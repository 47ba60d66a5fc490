//! Explicit state container for the two panels.
//!
//! The UI is modeled as named events applied to [`SessionState`] by a pure
//! transition function; side effects come back out as [`Command`]s for the
//! session loop to execute. Generation is asynchronous, so every issued
//! request gets a monotonically increasing id and completion events carry it
//! back — a completion whose id is not the latest issued request is stale and
//! ignored, which is what keeps a slow response from clobbering a newer one.

use renderer::RenderOutcome;
use shadergen::ShaderOrigin;
use tracing::debug;

pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum CalcResult {
    Value(f64),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Generated { source: String, origin: ShaderOrigin },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    EditExpression(String),
    Calculate,
    CalculationCompleted(CalcResult),
    EditDescription(String),
    GenerateShader,
    GenerationCompleted {
        request: RequestId,
        outcome: GenerationOutcome,
    },
    RenderCompleted {
        request: RequestId,
        outcome: RenderOutcome,
    },
}

/// Follow-up work produced by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Evaluate { expression: String },
    Generate { request: RequestId, description: String },
    Render { request: RequestId, source: String },
}

#[derive(Debug, Default)]
pub struct SessionState {
    pub expression: String,
    pub result: Option<CalcResult>,
    pub description: String,
    pub shader_source: Option<String>,
    pub shader_error: Option<String>,
    last_issued: RequestId,
    in_flight: Option<RequestId>,
}

impl SessionState {
    pub fn pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Applies one event, returning the follow-up command if any.
    ///
    /// Calculator and shader fields are disjoint: no event touches both
    /// panels.
    pub fn apply(&mut self, event: Event) -> Option<Command> {
        match event {
            Event::EditExpression(text) => {
                self.expression = text;
                None
            }
            Event::Calculate => Some(Command::Evaluate {
                expression: self.expression.clone(),
            }),
            Event::CalculationCompleted(result) => {
                self.result = Some(result);
                None
            }
            Event::EditDescription(text) => {
                self.description = text;
                None
            }
            Event::GenerateShader => {
                self.last_issued += 1;
                let request = self.last_issued;
                self.in_flight = Some(request);
                Some(Command::Generate {
                    request,
                    description: self.description.clone(),
                })
            }
            Event::GenerationCompleted { request, outcome } => {
                if self.in_flight != Some(request) {
                    debug!(request, current = self.last_issued, "discarding stale generation result");
                    return None;
                }
                self.in_flight = None;
                match outcome {
                    GenerationOutcome::Generated { source, origin } => {
                        self.shader_error = match origin {
                            ShaderOrigin::Remote => None,
                            ShaderOrigin::Fallback { transport_error } => Some(format!(
                                "generation failed ({transport_error}); using canned shader"
                            )),
                        };
                        self.shader_source = Some(source.clone());
                        Some(Command::Render { request, source })
                    }
                    GenerationOutcome::Failed { message } => {
                        self.shader_error = Some(message);
                        None
                    }
                }
            }
            Event::RenderCompleted { request, outcome } => {
                if request != self.last_issued {
                    debug!(request, current = self.last_issued, "discarding stale render result");
                    return None;
                }
                match outcome {
                    RenderOutcome::Rendered => {}
                    RenderOutcome::CompileError { stage, log } => {
                        self.shader_error =
                            Some(format!("shader {stage} compilation failed: {log}"));
                    }
                    RenderOutcome::ContextUnavailable => {
                        self.shader_error = Some(
                            "graphics context unavailable; shaders cannot be rendered this session"
                                .into(),
                        );
                    }
                }
                None
            }
        }
    }
}
