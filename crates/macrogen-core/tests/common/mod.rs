//! Shared helpers for engine integration tests

#![allow(dead_code)]

use indexmap::IndexMap;
use macrogen_catalog::Requirements;
use macrogen_core::{
    CapabilityError, EngineConfig, KeywordCapability, LanguageCapability, ParameterIntent,
    PhaseMachine, Reply, ReplyEvent, SelectionIntent, Session, SessionId, TurnContext,
};
use macrogen_schema::ParamValue;
use macrogen_test_utils as fixtures;
use std::sync::Arc;
use std::time::Duration;

/// Machine over the fixture catalog with the keyword capability
pub fn keyword_machine(config: EngineConfig) -> PhaseMachine {
    PhaseMachine::with_keywords(Arc::new(fixtures::catalog()), config).unwrap()
}

/// Machine over the catalog of array templates with the keyword capability
pub fn array_machine(config: EngineConfig) -> PhaseMachine {
    PhaseMachine::with_keywords(Arc::new(fixtures::array_catalog()), config).unwrap()
}

/// Machine over the fixture catalog with a custom capability
pub fn machine_with(capability: Arc<dyn LanguageCapability>, config: EngineConfig) -> PhaseMachine {
    PhaseMachine::new(Arc::new(fixtures::catalog()), capability, config).unwrap()
}

/// Send each message in turn, returning the last reply
pub async fn converse(machine: &PhaseMachine, session: &mut Session, messages: &[&str]) -> Reply {
    let mut last = None;
    for message in messages {
        last = Some(machine.handle(session, message).await.unwrap());
    }
    last.expect("at least one message")
}

pub fn new_session(machine: &PhaseMachine, id: &str) -> Session {
    machine.new_session(SessionId::from(id))
}

pub fn fallbacks(reply: &Reply) -> usize {
    reply
        .events
        .iter()
        .filter(|e| matches!(e, ReplyEvent::CapabilityFallback { .. }))
        .count()
}

/// Capability that is always unavailable
#[derive(Debug, Default)]
pub struct FailingCapability;

#[async_trait::async_trait]
impl LanguageCapability for FailingCapability {
    async fn requirements(&self, _: &TurnContext<'_>) -> Result<Requirements, CapabilityError> {
        Err(CapabilityError::Failed("offline".to_string()))
    }

    async fn selection(&self, _: &TurnContext<'_>) -> Result<SelectionIntent, CapabilityError> {
        Err(CapabilityError::Failed("offline".to_string()))
    }

    async fn parameter(&self, _: &TurnContext<'_>) -> Result<ParameterIntent, CapabilityError> {
        Err(CapabilityError::Failed("offline".to_string()))
    }

    async fn explain(&self, _: &TurnContext<'_>) -> Result<String, CapabilityError> {
        Err(CapabilityError::Failed("offline".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Capability that answers like the keyword capability, but late
#[derive(Debug)]
pub struct SlowCapability {
    pub delay: Duration,
    pub inner: KeywordCapability,
}

impl SlowCapability {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: KeywordCapability::from_candidates(&fixtures::candidates()),
        }
    }
}

#[async_trait::async_trait]
impl LanguageCapability for SlowCapability {
    async fn requirements(&self, ctx: &TurnContext<'_>) -> Result<Requirements, CapabilityError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.inner.extract_requirements(ctx))
    }

    async fn selection(&self, ctx: &TurnContext<'_>) -> Result<SelectionIntent, CapabilityError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.inner.classify_selection(ctx))
    }

    async fn parameter(&self, ctx: &TurnContext<'_>) -> Result<ParameterIntent, CapabilityError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.inner.classify_parameter(ctx))
    }

    async fn explain(&self, ctx: &TurnContext<'_>) -> Result<String, CapabilityError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.inner.describe(ctx))
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// Keyword capability whose prefill returns fixed values
#[derive(Debug)]
pub struct PrefillCapability {
    pub values: IndexMap<String, ParamValue>,
    pub inner: KeywordCapability,
}

impl PrefillCapability {
    pub fn new(values: &[(&str, ParamValue)]) -> Self {
        Self {
            values: values
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            inner: KeywordCapability::from_candidates(&fixtures::candidates()),
        }
    }
}

#[async_trait::async_trait]
impl LanguageCapability for PrefillCapability {
    async fn requirements(&self, ctx: &TurnContext<'_>) -> Result<Requirements, CapabilityError> {
        self.inner.requirements(ctx).await
    }

    async fn selection(&self, ctx: &TurnContext<'_>) -> Result<SelectionIntent, CapabilityError> {
        self.inner.selection(ctx).await
    }

    async fn parameter(&self, ctx: &TurnContext<'_>) -> Result<ParameterIntent, CapabilityError> {
        self.inner.parameter(ctx).await
    }

    async fn explain(&self, ctx: &TurnContext<'_>) -> Result<String, CapabilityError> {
        self.inner.explain(ctx).await
    }

    async fn prefill(
        &self,
        _: &TurnContext<'_>,
    ) -> Result<IndexMap<String, ParamValue>, CapabilityError> {
        Ok(self.values.clone())
    }

    fn name(&self) -> &str {
        "prefill"
    }
}
