//! Metadata-driven CRUD screen.
//!
//! A [`CrudScreen`] runs one list/detail screen from a [`ScreenConfig`]:
//!
//! ```text
//!   Idle ──enter──▶ Loading ──list + options settled──▶ Ready
//!                                                        │  ▲
//!                    open_create / open_edit ─▶ Form ────┤  │ submit ok / cancel
//!                    request_delete ──▶ ConfirmDelete ───┘  │ confirm / cancel
//! ```
//!
//! Overlays are only reachable from `Ready`. A successful create or edit
//! closes the form and re-reads the whole list; a failed one keeps the form
//! open with the error. Deletion removes the item locally once the server
//! confirms; a failed deletion closes the dialog and leaves a notice.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cmms_api::Transport;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::descriptor::{ColumnDescriptor, FieldDescriptor};
use super::form::{FormMode, FormState, build_payload};
use super::options::{OptionSets, SelectOption, resolve_options};
use super::render::{DisplayTokens, TableView, render_table};
use crate::cache::ExpiringCache;
use crate::error::CoreError;
use crate::model::{Entity, PrimaryKey, Record};
use crate::resource::{ResourceController, ResourceEndpoint};

/// Rewrites an item before it pre-populates the edit form.
pub type EditTransform<T> = Arc<dyn Fn(&T) -> T + Send + Sync>;

// ── Configuration ───────────────────────────────────────────────────

/// Everything that defines a screen.
pub struct ScreenConfig<T = Record> {
    pub title: String,
    pub endpoint: ResourceEndpoint,
    pub columns: Vec<ColumnDescriptor<T>>,
    pub fields: Vec<FieldDescriptor>,
    pub tokens: DisplayTokens,
    pub transform_for_edit: Option<EditTransform<T>>,
}

impl<T> ScreenConfig<T> {
    pub fn new(title: impl Into<String>, endpoint: ResourceEndpoint) -> Self {
        Self {
            title: title.into(),
            endpoint,
            columns: Vec::new(),
            fields: Vec::new(),
            tokens: DisplayTokens::default(),
            transform_for_edit: None,
        }
    }

    pub fn column(mut self, column: ColumnDescriptor<T>) -> Self {
        self.columns.push(column);
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn tokens(mut self, tokens: DisplayTokens) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn transform_for_edit<F>(mut self, transform: F) -> Self
    where
        F: Fn(&T) -> T + Send + Sync + 'static,
    {
        self.transform_for_edit = Some(Arc::new(transform));
        self
    }

    /// Descriptor of the field called `name`.
    pub fn field_named(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl<T> Clone for ScreenConfig<T> {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            endpoint: self.endpoint.clone(),
            columns: self.columns.clone(),
            fields: self.fields.clone(),
            tokens: self.tokens.clone(),
            transform_for_edit: self.transform_for_edit.clone(),
        }
    }
}

impl<T> fmt::Debug for ScreenConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenConfig")
            .field("title", &self.title)
            .field("endpoint", &self.endpoint)
            .field("columns", &self.columns.len())
            .field("fields", &self.fields.len())
            .finish_non_exhaustive()
    }
}

// ── State ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
}

/// Modal layer over the list.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay<T> {
    None,
    Form(FormState),
    ConfirmDelete(T),
}

/// What the list area shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListView {
    Loading,
    Error(String),
    Table(TableView),
}

// ── CrudScreen ──────────────────────────────────────────────────────

pub struct CrudScreen<T: Entity = Record> {
    config: ScreenConfig<T>,
    resource: ResourceController<T>,
    transport: Arc<dyn Transport>,
    cache: Arc<ExpiringCache>,
    options_ttl: Option<Duration>,
    phase: Phase,
    overlay: Overlay<T>,
    options: OptionSets,
    notice: Option<String>,
}

impl<T: Entity> CrudScreen<T> {
    pub fn new(
        config: ScreenConfig<T>,
        transport: Arc<dyn Transport>,
        cache: Arc<ExpiringCache>,
        cache_ttl: Option<Duration>,
    ) -> Self {
        let resource = ResourceController::new(
            config.endpoint.clone(),
            Arc::clone(&transport),
            Arc::clone(&cache),
            cache_ttl,
        );
        Self {
            config,
            resource,
            transport,
            cache,
            options_ttl: cache_ttl,
            phase: Phase::Idle,
            overlay: Overlay::None,
            options: OptionSets::default(),
            notice: None,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &ScreenConfig<T> {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn overlay(&self) -> &Overlay<T> {
        &self.overlay
    }

    pub fn form(&self) -> Option<&FormState> {
        match &self.overlay {
            Overlay::Form(form) => Some(form),
            _ => None,
        }
    }

    pub fn resource(&self) -> &ResourceController<T> {
        &self.resource
    }

    pub fn option_sets(&self) -> &OptionSets {
        &self.options
    }

    /// Options of a select field (empty if its source failed).
    pub fn options_for(&self, field: &str) -> &[SelectOption] {
        self.options.get(field)
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Enter the screen: read the list and every option source concurrently.
    ///
    /// Returns the list error, if any; option failures only empty their
    /// fields. The screen is `Ready` afterwards either way.
    pub async fn enter(&mut self) -> Result<(), CoreError> {
        self.phase = Phase::Loading;
        debug!(screen = %self.config.title, "entering screen");

        let (list, options) = tokio::join!(
            self.resource.load(),
            resolve_options(
                self.transport.as_ref(),
                &self.cache,
                self.options_ttl,
                &self.config.fields,
            ),
        );

        self.options = options;
        self.phase = Phase::Ready;
        list
    }

    /// Re-read the list from the server.
    pub async fn reload(&mut self) -> Result<(), CoreError> {
        self.resource.fetch_all().await
    }

    /// Re-resolve option sets (answers from the cache while it is fresh).
    pub async fn reload_options(&mut self) {
        self.options = resolve_options(
            self.transport.as_ref(),
            &self.cache,
            self.options_ttl,
            &self.config.fields,
        )
        .await;
    }

    /// The list area: a spinner, the read error, or the rendered table.
    pub fn view(&self) -> ListView {
        let state = self.resource.state();
        if self.phase != Phase::Ready || state.loading {
            return ListView::Loading;
        }
        if let Some(error) = state.error {
            return ListView::Error(error);
        }
        ListView::Table(render_table(
            &state.items,
            &self.config.columns,
            self.config.endpoint.pk_field(),
            &self.config.tokens,
        ))
    }

    // ── Form ─────────────────────────────────────────────────────────

    fn ensure_idle_ready(&self, action: &str) -> Result<(), CoreError> {
        if self.phase != Phase::Ready {
            return Err(CoreError::InvalidState {
                message: format!("cannot {action} while the screen is {}", self.phase),
            });
        }
        if !matches!(self.overlay, Overlay::None) {
            return Err(CoreError::InvalidState {
                message: format!("cannot {action} while a dialog is open"),
            });
        }
        Ok(())
    }

    fn find(&self, key: &PrimaryKey) -> Result<T, CoreError> {
        self.resource.get(key).ok_or_else(|| CoreError::NotFound {
            entity_type: self.config.title.clone(),
            identifier: key.to_string(),
        })
    }

    pub fn open_create(&mut self) -> Result<&FormState, CoreError> {
        self.ensure_idle_ready("open the create form")?;
        self.overlay = Overlay::Form(FormState::for_create(&self.config.fields));
        self.current_form()
    }

    pub fn open_edit(&mut self, key: &PrimaryKey) -> Result<&FormState, CoreError> {
        self.ensure_idle_ready("open the edit form")?;
        let item = self.find(key)?;
        let item = match &self.config.transform_for_edit {
            Some(transform) => transform(&item),
            None => item,
        };
        self.overlay = Overlay::Form(FormState::for_edit(key.clone(), &item, &self.config.fields));
        self.current_form()
    }

    fn current_form(&self) -> Result<&FormState, CoreError> {
        self.form().ok_or_else(|| CoreError::InvalidState {
            message: "no form is open".into(),
        })
    }

    /// Change a value in the open form.
    pub fn set_value(&mut self, name: &str, value: Value) -> Result<(), CoreError> {
        if self.config.field_named(name).is_none() {
            return Err(CoreError::validation(vec![crate::error::FieldError::new(
                name,
                "Unknown field.",
            )]));
        }
        match &mut self.overlay {
            Overlay::Form(form) => {
                form.set(name, value);
                Ok(())
            }
            _ => Err(CoreError::InvalidState {
                message: "no form is open".into(),
            }),
        }
    }

    /// Submit the open form.
    ///
    /// On success the form closes and the list is re-read in full. On
    /// failure the form stays open with the error and the error is returned.
    pub async fn submit(&mut self) -> Result<T, CoreError> {
        let (mode, values) = match &self.overlay {
            Overlay::Form(form) => (form.mode.clone(), form.values.clone()),
            _ => {
                return Err(CoreError::InvalidState {
                    message: "no form is open".into(),
                });
            }
        };

        let result = match build_payload(&self.config.fields, &values, &mode) {
            Ok(payload) => {
                let body = Value::Object(payload);
                match &mode {
                    FormMode::Create => self.resource.create(&body).await,
                    FormMode::Edit(key) => self.resource.update(key, &body).await,
                }
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(item) => {
                info!(screen = %self.config.title, "saved");
                self.overlay = Overlay::None;
                if let Err(err) = self.resource.fetch_all().await {
                    warn!(screen = %self.config.title, error = %err, "refresh after save failed");
                }
                Ok(item)
            }
            Err(err) => {
                self.resource.clear_error();
                if let Overlay::Form(form) = &mut self.overlay {
                    form.record_failure(&err);
                }
                Err(err)
            }
        }
    }

    /// Close the form or the delete dialog without doing anything.
    pub fn cancel(&mut self) {
        self.overlay = Overlay::None;
    }

    // ── Delete ───────────────────────────────────────────────────────

    pub fn request_delete(&mut self, key: &PrimaryKey) -> Result<&T, CoreError> {
        self.ensure_idle_ready("delete")?;
        let item = self.find(key)?;
        self.overlay = Overlay::ConfirmDelete(item);
        match &self.overlay {
            Overlay::ConfirmDelete(item) => Ok(item),
            _ => Err(CoreError::InvalidState {
                message: "no deletion is pending".into(),
            }),
        }
    }

    /// Delete the item awaiting confirmation.
    ///
    /// The dialog closes either way. A failure leaves the list untouched,
    /// sets a notice and is returned.
    pub async fn confirm_delete(&mut self) -> Result<(), CoreError> {
        let item = match std::mem::replace(&mut self.overlay, Overlay::None) {
            Overlay::ConfirmDelete(item) => item,
            other => {
                self.overlay = other;
                return Err(CoreError::InvalidState {
                    message: "no deletion is pending".into(),
                });
            }
        };
        let key = item
            .primary_key(self.config.endpoint.pk_field())
            .ok_or_else(|| CoreError::Shape {
                message: format!("item has no `{}` value", self.config.endpoint.pk_field()),
            })?;

        match self.resource.remove(&key).await {
            Ok(()) => {
                info!(screen = %self.config.title, key = %key, "deleted");
                Ok(())
            }
            Err(err) => {
                self.resource.clear_error();
                self.notice = Some(format!("Could not delete: {}", err.user_message()));
                Err(err)
            }
        }
    }
}
