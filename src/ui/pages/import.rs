//! Import Page - Pick a CSV file, preview it, bind columns, run the import
//!
//! ARCHITECTURE: preview and commit both go through the task bridge. The
//! page hands the worker owned snapshots (`ReadConfig`, `ColumnBindings`)
//! and only touches its view and the shared context from the continuation,
//! which runs on the UI thread.

use crate::config::ImportConfig;
use crate::i18n::Catalog;
use crate::import::{ColumnBindings, ImportColumn, ImportEngine, ImportSummary, PreviewResult, ReadConfig};
use crate::task::{TaskBridge, TaskResult};
use crate::ui::nav::NavAction;
use crate::ui::step::{run_default_action, Step, StepBase, StepHandle};
use crate::ui::view::{Control, ControlAction};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use std::sync::Arc;

pub const FILE_INPUT: &str = "importFile";
pub const DELIMITER_CHOICE: &str = "importFileDelimiter";
pub const ENCODING_CHOICE: &str = "importFileEncoding";
pub const PREVIEW_BUTTON: &str = "previewBtn";
pub const PREVIEW_PROGRESS: &str = "previewProgress";
pub const STATUS_LABEL: &str = "status";
pub const PREVIEW_TABLE: &str = "preview";
pub const IMPORT_BUTTON: &str = "importBtn";

/// Column binding choices are `column-0`, `column-1`, ...
pub const COLUMN_PREFIX: &str = "column-";

const PREVIEW_ACTION: &str = "preview";

/// Strings needed after load, resolved up front so a missing key fails setup
#[derive(Debug, Default)]
struct Texts {
    make_import: String,
    importing: String,
    no_file: String,
    preview_failed: String,
    import_failed: String,
    column: String,
}

pub struct ImportPage {
    base: StepBase,
    config: ImportConfig,
    engine: Arc<dyn ImportEngine>,
    tasks: TaskBridge,
    me: Weak<RefCell<ImportPage>>,
    texts: Texts,
    /// Localized labels of `config.columns`, same order
    column_labels: Vec<String>,
    /// Width of the current preview (number of column choices)
    preview_columns: usize,
    /// Between `on_shown` and `on_hide`
    shown: bool,
    previewing: bool,
    importing: bool,
}

impl ImportPage {
    pub fn new(
        strings: Catalog,
        config: ImportConfig,
        engine: Arc<dyn ImportEngine>,
        tasks: TaskBridge,
    ) -> StepHandle {
        let mut base = StepBase::new(strings);

        let view = base.view_mut();
        view.push(Control::input(FILE_INPUT, ""));
        view.push(Control::choice(DELIMITER_CHOICE, ""));
        view.push(Control::choice(ENCODING_CHOICE, ""));
        view.push(
            Control::button(PREVIEW_BUTTON, "")
                .with_action(ControlAction::Local(PREVIEW_ACTION.to_string())),
        );
        view.push(Control::indicator(PREVIEW_PROGRESS));
        view.push(Control::label(STATUS_LABEL, ""));
        view.push(Control::table(PREVIEW_TABLE));
        view.push(Control::button(IMPORT_BUTTON, ""));

        let page = Rc::new_cyclic(|me| {
            RefCell::new(Self {
                base,
                config,
                engine,
                tasks,
                me: me.clone(),
                texts: Texts::default(),
                column_labels: Vec::new(),
                preview_columns: 0,
                shown: false,
                previewing: false,
                importing: false,
            })
        });

        StepHandle::new(page)
    }

    fn selected_file(&self) -> Option<PathBuf> {
        self.base
            .context()
            .and_then(|context| context.with(|ctx| ctx.import.selected_file.clone()))
    }

    /// Snapshot of the read options, or `None` (with a hint) when no file is chosen
    fn read_config(&mut self) -> Option<ReadConfig> {
        let Some(file) = self.selected_file() else {
            let hint = self.texts.no_file.clone();
            self.base.view_mut().set_label(STATUS_LABEL, hint);
            return None;
        };

        let view = self.base.view();
        Some(ReadConfig {
            file,
            delimiter: view.value(DELIMITER_CHOICE).unwrap_or_default().to_string(),
            encoding: view.value(ENCODING_CHOICE).unwrap_or_default().to_string(),
            preview_rows: self.config.preview_rows,
        })
    }

    /// Bindings chosen in the column choices; unused columns are left out
    fn collect_bindings(&self) -> ColumnBindings {
        let view = self.base.view();
        let mut bindings = ColumnBindings::new();

        for index in 0..self.preview_columns {
            let Some(value) = view.value(&format!("{}{}", COLUMN_PREFIX, index)) else {
                continue;
            };
            let kind = self
                .column_labels
                .iter()
                .position(|label| label == value)
                .and_then(|pos| self.config.columns.get(pos))
                .map(|option| option.kind);

            match kind {
                Some(ImportColumn::Unused) | None => {}
                Some(kind) => {
                    bindings.insert(kind, index);
                }
            }
        }

        bindings
    }

    /// One background job at a time: while a preview or an import runs, the
    /// indicator is shown and both actions are locked. Navigation is locked
    /// while an import runs.
    fn update_busy(&mut self) {
        let busy = self.is_busy();
        let label = if self.importing {
            self.texts.importing.clone()
        } else {
            self.texts.make_import.clone()
        };

        let view = self.base.view_mut();
        view.set_visible(PREVIEW_PROGRESS, busy);
        view.set_enabled(PREVIEW_BUTTON, !busy);
        view.set_enabled(IMPORT_BUTTON, !busy);
        view.set_label(IMPORT_BUTTON, label);
        view.set_navigation_enabled(!self.importing);
    }

    fn clear_preview(&mut self) {
        self.preview_columns = 0;
        let view = self.base.view_mut();
        view.set_rows(PREVIEW_TABLE, Vec::new());
        view.remove_prefixed(COLUMN_PREFIX);
    }

    fn is_busy(&self) -> bool {
        self.previewing || self.importing
    }

    fn start_preview(&mut self) {
        if self.is_busy() {
            tracing::debug!("Preview requested while busy");
            return;
        }
        let Some(read) = self.read_config() else {
            return;
        };

        tracing::info!("Previewing {}", read.file.display());
        self.previewing = true;
        self.update_busy();

        let engine = self.engine.clone();
        let me = self.me.clone();
        self.tasks
            .run(move |read: ReadConfig| engine.compute_preview(&read), read)
            .then_ui(move |result| {
                if let Some(page) = me.upgrade() {
                    page.borrow_mut().preview_finished(result);
                }
            });
    }

    fn preview_finished(&mut self, result: TaskResult<PreviewResult>) {
        self.previewing = false;
        self.update_busy();

        match result {
            Ok(preview) => {
                self.clear_preview();
                self.preview_columns = preview.columns;

                let choices: Vec<Control> = (0..preview.columns)
                    .map(|index| {
                        Control::choice(
                            &format!("{}{}", COLUMN_PREFIX, index),
                            &format!("{} {}", self.texts.column, index + 1),
                        )
                        .with_options(self.column_labels.clone())
                    })
                    .collect();

                let view = self.base.view_mut();
                view.set_label(STATUS_LABEL, "");
                view.set_rows(PREVIEW_TABLE, preview.rows);
                for choice in choices {
                    view.push(choice);
                }
            }
            Err(e) => {
                let message = format!("{}: {}", self.texts.preview_failed, e);
                self.base.view_mut().set_label(STATUS_LABEL, message);
            }
        }
    }

    fn start_import(&mut self) {
        if self.is_busy() {
            tracing::debug!("Import requested while busy");
            return;
        }
        let Some(read) = self.read_config() else {
            return;
        };

        let bindings = self.collect_bindings();
        if let Some(context) = self.base.context() {
            context.with_mut(|ctx| ctx.import.column_bindings = bindings.clone());
        }

        tracing::info!(
            "Importing {} with {} bound columns",
            read.file.display(),
            bindings.len()
        );

        self.importing = true;
        self.update_busy();

        let engine = self.engine.clone();
        let me = self.me.clone();
        self.tasks
            .run(
                move |(read, bindings): (ReadConfig, ColumnBindings)| {
                    engine.commit_import(&read, &bindings)
                },
                (read, bindings),
            )
            .then_ui(move |result| {
                if let Some(page) = me.upgrade() {
                    page.borrow_mut().import_finished(result);
                }
            });
    }

    fn import_finished(&mut self, result: TaskResult<ImportSummary>) {
        self.importing = false;
        self.update_busy();

        match result {
            Ok(summary) => {
                if let Some(context) = self.base.context() {
                    context.with_mut(|ctx| ctx.import.last_import = Some(summary));
                }
                self.base.view_mut().set_label(STATUS_LABEL, "");
                if self.shown {
                    self.base.next();
                } else {
                    tracing::debug!("Import finished after the page was left; staying put");
                }
            }
            Err(e) => {
                let message = format!("{}: {}", self.texts.import_failed, e);
                self.base.view_mut().set_label(STATUS_LABEL, message);
            }
        }
    }
}

impl Step for ImportPage {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn on_load(&mut self) -> anyhow::Result<()> {
        let base = &mut self.base;

        for (id, key) in [
            (FILE_INPUT, "file_label"),
            (DELIMITER_CHOICE, "delimiter_label"),
            (ENCODING_CHOICE, "encoding_label"),
            (PREVIEW_BUTTON, "preview"),
            (IMPORT_BUTTON, "make_import"),
        ] {
            let text = base.get_string(key)?;
            base.view_mut().set_label(id, text);
        }

        let view = base.view_mut();
        view.set_options(DELIMITER_CHOICE, self.config.csv_delimiters.clone());
        view.set_options(ENCODING_CHOICE, self.config.file_encodings.clone());

        self.column_labels = self
            .config
            .columns
            .iter()
            .map(|option| base.localize(&option.label))
            .collect::<Result<_, _>>()?;

        self.texts = Texts {
            make_import: base.get_string("make_import")?,
            importing: base.get_string("import_importing")?,
            no_file: base.get_string("no_file")?,
            preview_failed: base.get_string("preview_failed")?,
            import_failed: base.get_string("import_failed")?,
            column: base.get_string("column")?,
        };

        Ok(())
    }

    fn on_shown(&mut self) {
        self.shown = true;

        let displayed = self.base.view().value(FILE_INPUT).unwrap_or_default().to_string();
        if let Some(file) = self.selected_file() {
            let file = file.display().to_string();
            if file != displayed {
                self.base.view_mut().set_value(FILE_INPUT, file);
            }
        } else if !displayed.is_empty() {
            self.base.view_mut().set_value(FILE_INPUT, "");
            self.clear_preview();
        }
    }

    fn on_hide(&mut self) {
        self.shown = false;
    }

    fn on_action(&mut self, action: &ControlAction) {
        match action {
            ControlAction::Local(name) if name == PREVIEW_ACTION => self.start_preview(),
            ControlAction::Navigate(NavAction::Next) => self.start_import(),
            other => run_default_action(&self.base, other),
        }
    }

    fn on_value_changed(&mut self, id: &str, value: &str) {
        if id != FILE_INPUT {
            tracing::debug!("{} = {}", id, value);
            return;
        }

        let file = Some(value.trim())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        if let Some(context) = self.base.context() {
            context.with_mut(|ctx| ctx.import.selected_file = file);
        }
        self.clear_preview();
    }
}
