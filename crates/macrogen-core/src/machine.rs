//! Conversation phase machine
//!
//! ```text
//! Understanding ──match──▶ Selecting ──select──▶ Collecting ──done──▶ Generating
//!       ▲                     │ back                  │ stop              │
//!       └─────────────────────┴───────────────────────┴───────────────────┘
//! ```
//!
//! `restart` returns to Understanding from any phase. Generating always
//! ends in Understanding, whether synthesis succeeds or not.

use crate::capability::{
    KeywordCapability, LanguageCapability, ParameterIntent, SelectionIntent, TurnContext,
};
use crate::config::EngineConfig;
use crate::error::{CapabilityError, EngineError};
use crate::reply::{ParameterPrompt, Reply, ReplyEvent};
use crate::session::Session;
use crate::types::{ControlWord, Phase, SessionId, Turn};
use crate::writer::ScriptWriter;
use indexmap::IndexMap;
use macrogen_catalog::{filter, materials, structure_types, Catalog, RequirementField};
use macrogen_schema::{
    BlockSchema, ParamValue, ParameterDescriptor, Predicate, SchemaCache, ValidationError,
};
use macrogen_synth::Synthesizer;
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives sessions through the conversation phases
#[derive(Debug)]
pub struct PhaseMachine {
    catalog: Arc<Catalog>,
    schemas: SchemaCache,
    capability: Arc<dyn LanguageCapability>,
    fallback: KeywordCapability,
    synthesizer: Synthesizer,
    writer: Option<ScriptWriter>,
    config: EngineConfig,
}

impl PhaseMachine {
    /// Create machine
    ///
    /// # Errors
    /// `EngineError::Config` if the configuration is invalid
    pub fn new(
        catalog: Arc<Catalog>,
        capability: Arc<dyn LanguageCapability>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let synthesizer = Synthesizer::new(config.policy()?);
        let writer = config
            .output_dir
            .as_ref()
            .map(|dir| ScriptWriter::new(dir.clone(), config.write_timeout()));
        Ok(Self {
            fallback: KeywordCapability::from_catalog(&catalog),
            schemas: SchemaCache::new(config.schema_cache_capacity),
            catalog,
            capability,
            synthesizer,
            writer,
            config,
        })
    }

    /// Create machine using only the local keyword capability
    ///
    /// # Errors
    /// `EngineError::Config` if the configuration is invalid
    pub fn with_keywords(catalog: Arc<Catalog>, config: EngineConfig) -> Result<Self, EngineError> {
        let keywords = Arc::new(KeywordCapability::from_catalog(&catalog));
        Self::new(catalog, keywords, config)
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Shared schema cache
    #[inline]
    #[must_use]
    pub fn schemas(&self) -> &SchemaCache {
        &self.schemas
    }

    /// Fresh session with the configured history limit
    #[must_use]
    pub fn new_session(&self, id: SessionId) -> Session {
        Session::new(id, self.config.history_limit)
    }

    /// Handle one user message
    ///
    /// Returns the structured reply; the session is left in the phase named
    /// by `Reply::phase`. Invalid values and capability failures are
    /// reported as events, not errors.
    ///
    /// # Errors
    /// - `EngineError::NotFound` if the selected block has no template
    /// - `EngineError::Parse` / `SchemaMismatch` if its template is malformed
    /// - Any synthesis or write error (the session is reset regardless)
    pub async fn handle(&self, session: &mut Session, text: &str) -> Result<Reply, EngineError> {
        let text = text.trim();
        session.record(Turn::user(text));
        let entered = session.phase;
        let mut reply = Reply::new();

        match (ControlWord::parse(text), session.phase) {
            (Some(ControlWord::Restart), _) => {
                session.reset();
                reply.push(ReplyEvent::Restarted);
            }
            (Some(ControlWord::Back), Phase::Selecting) => self.go_back(session, &mut reply),
            (Some(ControlWord::Stop), Phase::Collecting) => self.stop(session, &mut reply),
            (_, Phase::Understanding) => self.understand(session, text, &mut reply).await,
            (_, Phase::Selecting) => self.select(session, text, &mut reply).await?,
            (_, Phase::Collecting) => self.collect(session, text, &mut reply).await,
            (_, Phase::Generating) => {}
        }

        if session.phase == Phase::Generating {
            let outcome = self.generate(session, &mut reply).await;
            session.reset();
            outcome?;
        } else {
            session.record(Turn::assistant(reply.to_string()));
        }

        reply.phase = session.phase;
        if entered != reply.phase {
            info!(session = %session.id, from = %entered, to = %reply.phase, "phase transition");
        }
        Ok(reply)
    }

    async fn understand(&self, session: &mut Session, text: &str, reply: &mut Reply) {
        let update = {
            let ctx = context(session, text, None);
            self.consult(
                "requirements",
                reply,
                self.capability.requirements(&ctx),
                |k| k.extract_requirements(&ctx),
            )
            .await
        };
        session.requirements.merge(update);
        reply.push(ReplyEvent::RequirementsUpdated {
            requirements: session.requirements.clone(),
        });

        let missing = session.requirements.missing(&self.config.required_fields);
        if let Some(first) = missing.first() {
            let options = self.options_for(*first, session);
            reply.push(ReplyEvent::MissingFields {
                fields: missing,
                options,
            });
            return;
        }

        let candidates = filter(self.catalog.candidates(), &session.requirements);
        if candidates.is_empty() {
            debug!(session = %session.id, requirements = %session.requirements, "no matching block");
            reply.push(ReplyEvent::NoMatch {
                requirements: session.requirements.clone(),
            });
            return;
        }
        session.candidates = candidates.clone();
        session.phase = Phase::Selecting;
        reply.push(ReplyEvent::Candidates { candidates });
    }

    async fn select(
        &self,
        session: &mut Session,
        text: &str,
        reply: &mut Reply,
    ) -> Result<(), EngineError> {
        let intent = {
            let ctx = context(session, text, None);
            self.consult(
                "selection",
                reply,
                self.capability.selection(&ctx),
                |k| k.classify_selection(&ctx),
            )
            .await
        };

        match intent {
            SelectionIntent::Back => self.go_back(session, reply),
            SelectionIntent::Describe(_) => {
                let text = self.explain(session, text, None, reply).await;
                reply.push(ReplyEvent::Explanation { text });
                reply.push(ReplyEvent::ChooseCandidate {
                    count: session.candidates.len(),
                });
            }
            SelectionIntent::Select(k) if (1..=session.candidates.len()).contains(&k) => {
                self.choose(session, k - 1, text, reply).await?;
            }
            SelectionIntent::Select(_) | SelectionIntent::Unclear => {
                reply.push(ReplyEvent::InvalidSelection {
                    count: session.candidates.len(),
                });
            }
        }
        Ok(())
    }

    /// Load the chosen block and move to the first active parameter
    async fn choose(
        &self,
        session: &mut Session,
        index: usize,
        text: &str,
        reply: &mut Reply,
    ) -> Result<(), EngineError> {
        let candidate = session.candidates[index].clone();
        let source = self
            .catalog
            .require_template(&candidate.id)
            .map_err(|e| EngineError::from(e).in_phase(Phase::Selecting))?;
        let schema = self
            .schemas
            .get_or_extract(source)
            .await
            .map_err(|e| EngineError::from(e).in_phase(Phase::Selecting))?;

        info!(session = %session.id, block = %candidate.id, parameters = schema.len(), "block selected");
        reply.push(ReplyEvent::Selected {
            block_id: candidate.id.clone(),
            name: candidate.name.clone(),
            parameters: schema.len(),
        });
        session.select(candidate, Arc::clone(&schema));

        let mentioned = {
            let ctx = context(session, text, None);
            self.consult("prefill", reply, self.capability.prefill(&ctx), |k| {
                k.extract_values(&ctx)
            })
            .await
        };
        for (name, value) in mentioned {
            match self.accept(&schema, &name, &value) {
                Ok(value) => {
                    let label = schema
                        .get(&name)
                        .map(|d| d.label.clone())
                        .or_else(|| schema.group_of(&name).map(|(g, k)| g.label_for(k)))
                        .unwrap_or_else(|| name.clone());
                    session.values.insert(name.clone(), value.clone());
                    reply.push(ReplyEvent::Stored { name, label, value });
                }
                Err(e) => debug!(parameter = %name, error = %e, "prefilled value ignored"),
            }
        }

        self.advance(session, reply);
        Ok(())
    }

    async fn collect(&self, session: &mut Session, text: &str, reply: &mut Reply) {
        let Some(schema) = session.schema.clone() else {
            session.phase = Phase::Generating;
            return;
        };
        let order = self.collection_order(&schema, &session.values);
        let Some(current) = session
            .cursor
            .as_deref()
            .and_then(|name| order.iter().find(|d| d.name == name))
            .cloned()
        else {
            self.advance(session, reply);
            return;
        };

        let intent = {
            let ctx = context(session, text, Some(&*current));
            self.consult(
                "parameter",
                reply,
                self.capability.parameter(&ctx),
                |k| k.classify_parameter(&ctx),
            )
            .await
        };

        match intent {
            ParameterIntent::Stop => self.stop(session, reply),
            ParameterIntent::Help => {
                let text = self.explain(session, text, Some(&*current), reply).await;
                reply.push(ReplyEvent::Explanation { text });
                self.prompt(session, reply);
            }
            ParameterIntent::UseDefault | ParameterIntent::Unparseable => {
                let value = current.default.value.clone();
                session.values.insert(current.name.clone(), value.clone());
                reply.push(ReplyEvent::DefaultUsed {
                    name: current.name.clone(),
                    label: current.label.clone(),
                    value,
                });
                self.advance(session, reply);
            }
            ParameterIntent::Provide(value) => {
                match self.accept(&schema, &current.name, &value) {
                    Ok(value) => {
                        session.values.insert(current.name.clone(), value.clone());
                        reply.push(ReplyEvent::Stored {
                            name: current.name.clone(),
                            label: current.label.clone(),
                            value,
                        });
                        self.advance(session, reply);
                    }
                    Err(e) => {
                        debug!(session = %session.id, parameter = %current.name, error = %e, "value rejected");
                        reply.push(ReplyEvent::Invalid {
                            name: current.name.clone(),
                            message: e.to_string(),
                        });
                        self.prompt(session, reply);
                    }
                }
            }
        }
    }

    async fn generate(&self, session: &Session, reply: &mut Reply) -> Result<(), EngineError> {
        let (Some(candidate), Some(schema)) = (&session.selected, &session.schema) else {
            return Err(EngineError::not_found("no block selected").in_phase(Phase::Generating));
        };
        let scoped = |e: EngineError| e.in_block(&candidate.id).in_phase(Phase::Generating);

        let source = self
            .catalog
            .require_template(&candidate.id)
            .map_err(|e| scoped(e.into()))?;
        let script = self
            .synthesizer
            .synthesize(source, schema, &session.values, session.id.as_str())
            .map_err(|e| scoped(e.into()))?;

        let written = match &self.writer {
            Some(writer) => Some(writer.write(&script).await.map_err(|e| scoped(e.into()))?),
            None => None,
        };
        reply.push(ReplyEvent::Generated { script });
        if let Some(path) = written {
            reply.push(ReplyEvent::Written { path });
        }
        Ok(())
    }

    fn go_back(&self, session: &mut Session, reply: &mut Reply) {
        session.discard_block();
        session.requirements.clear();
        session.phase = Phase::Understanding;
        reply.push(ReplyEvent::WentBack);
    }

    /// Leave the block; requirements are kept
    fn stop(&self, session: &mut Session, reply: &mut Reply) {
        session.discard_block();
        session.phase = Phase::Understanding;
        reply.push(ReplyEvent::Stopped);
    }

    /// Move the cursor to the next active, unresolved parameter
    ///
    /// Forward only: parameters before the cursor are never revisited.
    fn advance(&self, session: &mut Session, reply: &mut Reply) {
        let Some(schema) = session.schema.clone() else {
            session.phase = Phase::Generating;
            return;
        };
        let order = self.collection_order(&schema, &session.values);
        let start = session
            .cursor
            .as_deref()
            .and_then(|name| order.iter().position(|d| d.name == name))
            .map_or(0, |i| i + 1);

        let next = order[start.min(order.len())..]
            .iter()
            .find(|d| {
                !session.values.contains_key(&d.name) && self.is_active(d, &schema, &session.values)
            })
            .map(|d| d.name.clone());

        match next {
            Some(name) => {
                session.cursor = Some(name);
                self.prompt(session, reply);
            }
            None => {
                session.cursor = None;
                session.phase = Phase::Generating;
            }
        }
    }

    fn prompt(&self, session: &Session, reply: &mut Reply) {
        let (Some(schema), Some(cursor)) = (&session.schema, &session.cursor) else {
            return;
        };
        let order = self.collection_order(schema, &session.values);
        if let Some(i) = order.iter().position(|d| &d.name == cursor) {
            reply.push(ReplyEvent::Prompt {
                prompt: ParameterPrompt::new(&order[i], i + 1, order.len()),
            });
        }
    }

    /// Descriptors in collection order
    ///
    /// Members the policy generates (up to the driver's value) follow the
    /// group's last declared member, derived from it.
    fn collection_order<'s>(
        &self,
        schema: &'s BlockSchema,
        values: &IndexMap<String, ParamValue>,
    ) -> Vec<Cow<'s, ParameterDescriptor>> {
        let mut order: Vec<Cow<'s, ParameterDescriptor>> = Vec::with_capacity(schema.len());
        for descriptor in schema.iter() {
            order.push(Cow::Borrowed(descriptor));

            for group in schema.groups.iter().filter(|g| {
                schema
                    .last_member(g)
                    .is_some_and(|last| last.name == descriptor.name)
            }) {
                let count = driver_count(schema, values, &group.driver);
                for k in self.synthesizer.generated_members(schema, group, count) {
                    let mut generated = descriptor.clone();
                    generated.name = group.member_name(k);
                    generated.label = group.label_for(k);
                    generated.member_index = Some(k);
                    order.push(Cow::Owned(generated));
                }
            }
        }
        order
    }

    /// Validate a value, including the member capacity of array drivers
    fn accept(
        &self,
        schema: &BlockSchema,
        name: &str,
        value: &ParamValue,
    ) -> Result<ParamValue, EngineError> {
        let scoped = |e: EngineError| {
            e.in_block(&schema.block_id)
                .for_parameter(name)
                .in_phase(Phase::Collecting)
        };
        let descriptor = schema
            .descriptor_for(name)
            .ok_or_else(|| scoped(EngineError::not_found(format!("parameter {name}"))))?;
        let value = descriptor
            .validate(value)
            .map_err(|e| scoped(e.into()))?;

        if let Some(capacity) = self.synthesizer.member_capacity(schema, name) {
            let requested = value.as_i64().unwrap_or(0);
            if usize::try_from(requested).is_ok_and(|n| n > capacity) {
                return Err(scoped(
                    ValidationError::TooManyMembers {
                        name: name.to_string(),
                        value: requested,
                        capacity,
                    }
                    .into(),
                ));
            }
        }
        Ok(value)
    }

    /// Dependency satisfied and, for array members, within the driver count
    fn is_active(
        &self,
        descriptor: &ParameterDescriptor,
        schema: &BlockSchema,
        values: &IndexMap<String, ParamValue>,
    ) -> bool {
        if let (Some(driver), Some(k)) = (&descriptor.array_driver, descriptor.member_index) {
            if k > driver_count(schema, values, driver) {
                return false;
            }
        }
        let Some(dependency) = &descriptor.dependency else {
            return true;
        };
        let lookup = |name: &str| {
            values
                .get(name)
                .or_else(|| schema.get(name).map(ParameterDescriptor::default_value))
                .cloned()
        };
        match Predicate::parse(dependency).and_then(|p| p.evaluate(lookup)) {
            Ok(holds) => holds,
            Err(e) => {
                warn!(
                    parameter = %descriptor.name,
                    dependency = %dependency,
                    error = %e,
                    "dependency cannot be evaluated, treating as satisfied"
                );
                true
            }
        }
    }

    async fn explain(
        &self,
        session: &Session,
        text: &str,
        descriptor: Option<&ParameterDescriptor>,
        reply: &mut Reply,
    ) -> String {
        let ctx = context(session, text, descriptor);
        self.consult("explain", reply, self.capability.explain(&ctx), |k| {
            k.describe(&ctx)
        })
        .await
    }

    /// Values the catalog offers for a missing requirement field
    fn options_for(&self, field: RequirementField, session: &Session) -> Vec<String> {
        let reqs = &session.requirements;
        let candidates = self.catalog.candidates();
        match field {
            RequirementField::Dimensionality => {
                let mut dims: Vec<String> = candidates
                    .iter()
                    .map(|c| c.dimensionality.trim().to_uppercase())
                    .filter(|d| !d.is_empty())
                    .collect();
                dims.sort();
                dims.dedup();
                dims
            }
            RequirementField::StructureType => {
                structure_types(candidates, reqs.dimensionality.as_deref())
            }
            RequirementField::Material => materials(
                candidates,
                reqs.dimensionality.as_deref(),
                reqs.structure_type.as_deref(),
            ),
            RequirementField::Application => Vec::new(),
        }
    }

    /// Run a capability call under the timeout, falling back to keywords
    async fn consult<T, F>(
        &self,
        operation: &'static str,
        reply: &mut Reply,
        call: F,
        fallback: impl FnOnce(&KeywordCapability) -> T,
    ) -> T
    where
        F: Future<Output = Result<T, CapabilityError>>,
    {
        let timeout = self.config.capability_timeout();
        let failure = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => return value,
            Ok(Err(e)) => e,
            Err(_) => CapabilityError::Timeout(timeout),
        };
        let err = EngineError::from(failure);
        warn!(
            capability = self.capability.name(),
            operation,
            error = %err,
            "capability failed, using keyword fallback"
        );
        reply.push(ReplyEvent::CapabilityFallback {
            operation: operation.to_string(),
            reason: err.to_string(),
        });
        fallback(&self.fallback)
    }
}

fn context<'a>(
    session: &'a Session,
    text: &'a str,
    descriptor: Option<&'a ParameterDescriptor>,
) -> TurnContext<'a> {
    TurnContext {
        text,
        phase: session.phase,
        history: &session.history,
        requirements: &session.requirements,
        candidates: &session.candidates,
        schema: session.schema.as_deref(),
        descriptor,
    }
}

/// Member count requested through a driver (resolved value or default)
fn driver_count(schema: &BlockSchema, values: &IndexMap<String, ParamValue>, driver: &str) -> usize {
    values
        .get(driver)
        .or_else(|| schema.get(driver).map(ParameterDescriptor::default_value))
        .and_then(ParamValue::as_i64)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}
