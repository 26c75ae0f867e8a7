//! The turn loop: classify intent, assemble the prompt, stream from the
//! model, dispatch tools, and repeat until the model answers in plain text.

use std::collections::HashSet;

use futures::StreamExt;

use turnloop_core::ErrorType;
use turnloop_events::ContentBlockType;
use turnloop_intent::{Complexity, IntentResult};
use turnloop_llm::{Message, StreamEvent, ToolCall as LlmToolCall, ToolCallResult};
use turnloop_plan::render_markdown;
use turnloop_prompt::{InjectionContext, InjectionOrchestrator};
use turnloop_state::OperationOutcome;
use turnloop_tools::{ToolCall as ExecToolCall, ToolContext, ToolOutcome};

use crate::config::RejectionPolicy;
use crate::error::{RuntimeError, RuntimeResult};
use crate::retry::stream_with_retry;
use crate::session::Session;

use super::AgentOrchestrator;

fn complexity_str(complexity: Complexity) -> &'static str {
    match complexity {
        Complexity::Simple => "simple",
        Complexity::Medium => "medium",
        Complexity::Complex => "complex",
    }
}

fn block_type_from_str(s: &str) -> ContentBlockType {
    match s {
        "thinking" => ContentBlockType::Thinking,
        "tool_use" => ContentBlockType::ToolUse,
        _ => ContentBlockType::Text,
    }
}

impl AgentOrchestrator {
    /// Run one user turn to completion.
    ///
    /// Classifies intent, builds the layered system prompt and message
    /// list through the Injection Orchestrator, streams from the model,
    /// and — for as long as the model keeps requesting tools — dispatches
    /// them (serial-only tools run one at a time; everything else runs
    /// concurrently) and loops. Returns once the model answers in plain
    /// text, or once `max_turns` is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the model stream fails in a way the retry
    /// policy gives up on, or if `max_turns` is reached first.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        tool_ctx: &ToolContext,
        user_input: &str,
    ) -> RuntimeResult<()> {
        let turn_deadline = std::time::Instant::now() + self.config.max_duration;
        let mut consecutive_tool_failures: u32 = 0;

        let intent = self.classify_intent(session, user_input).await;
        let plan = self.plan_manager.get(&session.id);
        let injection_ctx = InjectionContext {
            session_id: session.id.clone(),
            task_complexity: complexity_str(intent.complexity).to_string(),
            relevant_skill_groups: intent.relevant_skill_groups.clone(),
            is_follow_up: intent.is_follow_up,
            has_plan: plan.is_some(),
            plan_required_skills: plan.as_ref().map(turnloop_plan::Plan::required_skills).unwrap_or_default(),
            plan_has_failure: plan.as_ref().is_some_and(turnloop_plan::Plan::has_failure),
            prior_message_count: session.messages.len(),
            precomputed_history_summary: None,
            skip_memory: intent.skip_memory,
            attached_user_profile: None,
            query: user_input.to_string(),
            todo_markdown: plan.as_ref().map(render_markdown),
            editor_context: None,
            involves_ui_automation: false,
            extra: std::collections::BTreeMap::new(),
        };

        let mut working_messages = self
            .injector
            .build_messages(&injection_ctx, &session.messages, user_input)
            .await;
        let system_blocks = self.injector.build_system_blocks(&injection_ctx).await;
        let tool_schemas = self.capabilities.get_tool_schemas();
        let tool_definitions = InjectionOrchestrator::tool_definitions(&tool_schemas);
        let serial_only = self.capabilities.serial_only_tools();

        loop {
            if session.turn_count >= self.config.max_turns {
                return Err(RuntimeError::TurnLimitReached(self.config.max_turns));
            }
            if std::time::Instant::now() >= turn_deadline {
                tracing::info!(session_id = %session.id, "turn loop stopped: max_duration_seconds exceeded");
                self.broadcaster.session_end(&session.id, "stopped").await;
                self.broadcaster.done(&session.id).await;
                return Ok(());
            }
            if session.cancel_token.is_cancelled() {
                tracing::info!(session_id = %session.id, "turn loop cancelled by explicit stop request");
                self.broadcaster.session_stopped(&session.id, "user_requested").await;
                self.broadcaster.done(&session.id).await;
                return Ok(());
            }
            session.turn_count += 1;
            if session.turn_count == self.config.long_running_confirm_after_turns {
                self.broadcaster
                    .message_delta(
                        &session.id,
                        "hitl",
                        serde_json::json!({"signal": "long_running_confirm", "turn": session.turn_count}),
                    )
                    .await;
            }

            self.broadcaster
                .message_start(&session.id, turnloop_core::MessageId::new())
                .await;

            let stream_result = stream_with_retry(
                self.llm.as_ref(),
                &working_messages,
                &tool_definitions,
                &system_blocks,
                &self.config,
            )
            .await;

            let mut stream = match stream_result {
                Ok(stream) => stream,
                Err(err) => return self.fail_turn(session, err).await,
            };

            let mut response_text = String::new();
            let mut tool_calls: Vec<LlmToolCall> = Vec::new();
            let mut current_args: std::collections::HashMap<String, String> = std::collections::HashMap::new();

            loop {
                let next = tokio::select! {
                    biased;
                    () = session.cancel_token.cancelled() => {
                        return self.cancel_turn(session).await;
                    }
                    polled = tokio::time::timeout(self.config.idle_timeout, stream.next()) => polled,
                };
                let event = match next {
                    Ok(Some(event)) => event,
                    Ok(None) => break,
                    Err(_elapsed) => {
                        self.broadcaster
                            .error(&session.id, "idle timeout waiting on the model stream", ErrorType::Timeout)
                            .await;
                        self.broadcaster.session_end(&session.id, "failed").await;
                        return Err(RuntimeError::IdleTimeout(self.config.idle_timeout.as_secs()));
                    }
                };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => return self.fail_turn(session, err).await,
                };
                match event {
                    StreamEvent::ContentStart { index, block_type } => {
                        self.broadcaster
                            .content_start(&session.id, index, block_type_from_str(&block_type))
                            .await;
                    }
                    StreamEvent::TextDelta { index, text } => {
                        response_text.push_str(&text);
                        self.broadcaster.content_delta(&session.id, index, text).await;
                    }
                    StreamEvent::ReasoningDelta { index, text } => {
                        self.broadcaster.content_delta(&session.id, index, text).await;
                    }
                    StreamEvent::ToolCallStart { index, id, name } => {
                        tool_calls.push(LlmToolCall::new(id.clone(), name));
                        current_args.insert(id, String::new());
                        self.broadcaster
                            .content_start(&session.id, index, ContentBlockType::ToolUse)
                            .await;
                    }
                    StreamEvent::ToolCallDelta { index: _, id, args_delta } => {
                        current_args.entry(id).or_default().push_str(&args_delta);
                    }
                    StreamEvent::ContentStop { index } => {
                        self.broadcaster.content_stop(&session.id, index).await;
                    }
                    StreamEvent::Usage { input_tokens, output_tokens } => {
                        tracing::debug!(input_tokens, output_tokens, "turn usage");
                    }
                    StreamEvent::Done { .. } => break,
                    StreamEvent::Error(message) => {
                        self.broadcaster
                            .error(&session.id, message.clone(), ErrorType::LlmStreamError)
                            .await;
                        self.broadcaster.session_end(&session.id, "failed").await;
                        return Err(RuntimeError::Llm(turnloop_llm::LlmError::ParseError(message)));
                    }
                }
            }

            for call in &mut tool_calls {
                if let Some(raw) = current_args.get(&call.id) {
                    if let Ok(parsed) = serde_json::from_str(raw) {
                        call.arguments = parsed;
                    }
                }
            }

            self.broadcaster.message_stop(&session.id).await;

            if !tool_calls.is_empty() {
                working_messages.push(Message::assistant_with_tools(tool_calls.clone()));
                let results = self.dispatch_tool_calls(session, tool_ctx, &tool_calls, &serial_only).await;
                for result in &results {
                    if result.is_error {
                        consecutive_tool_failures += 1;
                    } else {
                        consecutive_tool_failures = 0;
                    }
                }
                if consecutive_tool_failures >= self.config.consecutive_failure_limit {
                    self.broadcaster
                        .error(
                            &session.id,
                            format!("{consecutive_tool_failures} consecutive tool failures"),
                            ErrorType::TerminatorStop,
                        )
                        .await;
                    self.broadcaster.session_end(&session.id, "failed").await;
                    return Err(RuntimeError::ConsecutiveToolFailures(consecutive_tool_failures));
                }
                for result in results {
                    working_messages.push(Message::tool_result(result));
                }
                continue;
            }

            session.messages.push(Message::user(user_input));
            if !response_text.is_empty() {
                session.messages.push(Message::assistant(&response_text));
            }
            self.broadcaster.session_end(&session.id, "completed").await;
            self.broadcaster.done(&session.id).await;
            return Ok(());
        }
    }

    async fn classify_intent(&self, session: &Session, user_input: &str) -> IntentResult {
        match &self.intent_analyzer {
            Some(analyzer) => analyzer.analyze(user_input, session.recent_context().as_deref()).await,
            None => IntentResult::safe_default(),
        }
    }

    async fn fail_turn(&self, session: &Session, err: turnloop_llm::LlmError) -> RuntimeResult<()> {
        tracing::error!(error = %err, classification = ?err.classify(), "turn ended on an unrecoverable stream error");
        self.broadcaster.error(&session.id, err.to_string(), err.classify()).await;
        self.broadcaster.session_end(&session.id, "failed").await;
        Err(RuntimeError::Llm(err))
    }

    /// End the turn because the caller explicitly requested a stop via
    /// `session.cancel_token`. Emits `session_stopped(reason="user_requested")`
    /// rather than an `error`/`session_end` pair — this is a deliberate
    /// stop, not a failure — followed by the same `message_stop`/`done`
    /// close-out every other exit from the loop emits.
    async fn cancel_turn(&self, session: &Session) -> RuntimeResult<()> {
        tracing::info!(session_id = %session.id, "turn loop cancelled by explicit stop request");
        self.broadcaster.message_stop(&session.id).await;
        self.broadcaster.session_stopped(&session.id, "user_requested").await;
        self.broadcaster.done(&session.id).await;
        Ok(())
    }

    /// Dispatch a batch of tool calls from one assistant response.
    /// Serial-only tools (per [`turnloop_capabilities::CapabilityRegistry::serial_only_tools`])
    /// run one at a time after every other call in the batch has already
    /// run concurrently; this never reorders results relative to the
    /// calls the model made, only their execution overlap.
    async fn dispatch_tool_calls(
        &self,
        session: &Session,
        tool_ctx: &ToolContext,
        tool_calls: &[LlmToolCall],
        serial_only: &HashSet<String>,
    ) -> Vec<ToolCallResult> {
        if let Some(state_manager) = &self.state_manager {
            if state_manager.check_pre_task().await {
                if let Err(err) = state_manager.snapshot("automatic pre-task snapshot").await {
                    tracing::warn!(%err, "pre-task snapshot failed, continuing without one");
                }
            }
        }

        let mut results: Vec<Option<ToolCallResult>> = tool_calls.iter().map(|_| None).collect();
        let mut concurrent_indices = Vec::new();
        let mut serial_indices = Vec::new();
        for (i, call) in tool_calls.iter().enumerate() {
            if serial_only.contains(&call.name) {
                serial_indices.push(i);
            } else {
                concurrent_indices.push(i);
            }
        }

        let concurrent_futures = concurrent_indices
            .iter()
            .map(|&i| self.run_one_tool(session, tool_ctx, &tool_calls[i]));
        let concurrent_results = futures::future::join_all(concurrent_futures).await;
        for (&i, result) in concurrent_indices.iter().zip(concurrent_results) {
            results[i] = Some(result);
        }

        for &i in &serial_indices {
            results[i] = Some(self.run_one_tool(session, tool_ctx, &tool_calls[i]).await);
        }

        results
            .into_iter()
            .map(|r| r.expect("every index is filled by exactly one of the two dispatch groups"))
            .collect()
    }

    async fn run_one_tool(&self, session: &Session, tool_ctx: &ToolContext, call: &LlmToolCall) -> ToolCallResult {
        let exec_call = ExecToolCall {
            tool_name: call.name.clone(),
            tool_input: call.arguments.clone(),
            tool_id: call.id.clone(),
            skip_compaction: false,
        };
        let outcome = self.tool_executor.execute(exec_call, tool_ctx).await;

        if let Some(state_manager) = &self.state_manager {
            let task_outcome = match &outcome {
                ToolOutcome::Success { .. } => OperationOutcome::success(call.name.clone()),
                ToolOutcome::Error { error_type, .. } if *error_type == ErrorType::Timeout => {
                    OperationOutcome::failure(format!("{} timed out", call.name)).critical()
                }
                ToolOutcome::Error { error, .. } => OperationOutcome::failure(format!("{}: {error}", call.name)),
            };
            if let Some(alert) = state_manager.record_operation(&session.id, task_outcome).await {
                tracing::warn!(reason = %alert.reason, streak = alert.consecutive_failures, "consistency alert raised");
            }
        }

        if let ToolOutcome::Error { error_type, .. } = &outcome {
            if *error_type == ErrorType::PermissionDenied && self.config.on_rejection == RejectionPolicy::AskRollback {
                self.broadcaster
                    .message_delta(
                        &session.id,
                        "hitl",
                        serde_json::json!({"signal": "ask_rollback", "tool_name": call.name}),
                    )
                    .await;
            }
        }

        match outcome {
            ToolOutcome::Success { content, .. } => ToolCallResult::success(call.id.clone(), content.render()),
            ToolOutcome::Error { error, .. } => ToolCallResult::error(call.id.clone(), error),
        }
    }
}
