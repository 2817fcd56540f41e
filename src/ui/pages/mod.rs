//! Wizard Pages - The steps of the CSV import wizard

pub mod complete;
pub mod import;
pub mod welcome;

pub use complete::CompletePage;
pub use import::ImportPage;
pub use welcome::WelcomePage;

use crate::config::WizardConfig;
use crate::error::WizardError;
use crate::i18n::Localization;
use crate::import::ImportEngine;
use crate::task::TaskBridge;
use crate::ui::host::WizardHost;
use crate::ui::main_loop::UiLoop;
use crate::ui::nav::NavigationDescriptor;
use crate::ui::wizard::{StepEntry, Wizard};
use std::sync::Arc;

pub const WELCOME: &str = "welcome";
pub const IMPORT: &str = "import";
pub const COMPLETE: &str = "complete";

/// Assemble welcome -> import -> complete. Call `setup` on the result.
pub fn import_wizard(
    ui: &UiLoop,
    host: impl WizardHost + 'static,
    tasks: TaskBridge,
    config: &WizardConfig,
    l10n: &Localization,
    engine: Arc<dyn ImportEngine>,
) -> Result<Wizard, WizardError> {
    let wizard = Wizard::new(ui, host);

    let strings = l10n.bundle(WELCOME);
    let title = strings.get_string("title")?;
    wizard.add_step(
        StepEntry::new(WELCOME, title, WelcomePage::new(strings))
            .nav(NavigationDescriptor::next("%start")),
    );

    let strings = l10n.bundle(IMPORT);
    let title = strings.get_string("title")?;
    wizard.add_step(
        StepEntry::new(
            IMPORT,
            title,
            ImportPage::new(strings, config.import.clone(), engine, tasks),
        )
        .nav(NavigationDescriptor::prev("%back"))
        .nav(NavigationDescriptor::next("%make_import").bind(import::IMPORT_BUTTON)),
    );

    let strings = l10n.bundle(COMPLETE);
    let title = strings.get_string("title")?;
    wizard.add_step(
        StepEntry::new(COMPLETE, title, CompletePage::new(strings))
            .nav(NavigationDescriptor::prev("%back"))
            .nav(NavigationDescriptor::custom(IMPORT, "%import_another")),
    );

    Ok(wizard)
}
