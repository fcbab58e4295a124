//! File list locators and steps.
//!
//! The same file list widget is embedded in several pages, so every locator
//! here is built under a scope (`None` for the document root). Steps read the
//! scope recorded for the current actor from the [`ScenarioController`];
//! whichever step opened the page is expected to have called
//! [`FileListSteps::set_file_list_scope`].
//!
//! [`FileListSteps`] holds no state and is therefore not an
//! [`ActorAware`](crate::scope::ActorAware) listener itself. The per-actor
//! file list scope lives in the controller's
//! [`ScopeRegistry`](crate::scope::ScopeRegistry), which is the `ActorAware`
//! component that follows actor switches on behalf of these steps.
//!
//! File names reach the XPath expressions only through
//! [`Predicate::text_equals`], which normalises and escapes them.

use tracing::info;

use crate::assertion::{assert_false, fail};
use crate::locator::Locator;
use crate::query::{Predicate, XPathBuilder};
use crate::result::{HarnessError, HarnessResult};
use crate::scenario::ScenarioController;
use crate::session::{BrowserSession, ElementHandle};
use crate::wait::{element_eventually_not_shown, WaitOutcome};

// =============================================================================
// LOCATORS
// =============================================================================

/// Loading spinner covering the file list
#[must_use]
pub fn main_working_icon(scope: Option<&Locator>) -> Locator {
    Locator::for_css(".mask.icon-loading")
        .within(scope)
        .described_as("Main working icon in file list")
}

/// "+" button opening the create menu
#[must_use]
pub fn create_menu_button(scope: Option<&Locator>) -> Locator {
    Locator::for_css("#controls .button.new")
        .within(scope)
        .described_as("Create menu button in file list")
}

fn create_menu_item_for(scope: Option<&Locator>, new_type: &str) -> Locator {
    let expression = XPathBuilder::anywhere("div")
        .filter(Predicate::has_class("newFileMenu"))
        .descendant("span")
        .filter(Predicate::text_equals(new_type))
        .ancestor("li")
        .build();
    Locator::for_xpath(expression)
        .within(scope)
        .described_as(format!("Create {new_type} menu item in file list"))
}

/// "New folder" entry of the create menu
#[must_use]
pub fn create_new_folder_menu_item(scope: Option<&Locator>) -> Locator {
    create_menu_item_for(scope, "New folder")
}

/// Name input shown once "New folder" is chosen
#[must_use]
pub fn create_new_folder_menu_item_name_input(scope: Option<&Locator>) -> Locator {
    Locator::for_css(".filenameform input")
        .descendant_of(&create_new_folder_menu_item(scope))
        .described_as("Name input in create new folder menu item in file list")
}

/// Table row of the file called `file_name`
#[must_use]
pub fn row_for_file(scope: Option<&Locator>, file_name: &str) -> Locator {
    let expression = XPathBuilder::anywhere("*")
        .filter(Predicate::attribute_equals("id", "fileList"))
        .descendant("span")
        .filter(Predicate::has_class("nametext").and(Predicate::text_equals(file_name)))
        .ancestor("tr")
        .build();
    Locator::for_xpath(expression)
        .within(scope)
        .described_as(format!("Row for file {file_name} in file list"))
}

fn in_row(css: &str, scope: Option<&Locator>, file_name: &str, what: &str) -> Locator {
    Locator::for_css(css)
        .descendant_of(&row_for_file(scope, file_name))
        .described_as(format!("{what} for file {file_name} in file list"))
}

/// Star toggling the favorite state
#[must_use]
pub fn favorite_action_for_file(scope: Option<&Locator>, file_name: &str) -> Locator {
    in_row(".action-favorite", scope, file_name, "Favorite action")
}

/// Filled star shown once the file is a favorite
#[must_use]
pub fn favorited_state_icon_for_file(scope: Option<&Locator>, file_name: &str) -> Locator {
    Locator::for_css(".icon-starred")
        .descendant_of(&favorite_action_for_file(scope, file_name))
        .described_as(format!(
            "Favorited state icon for file {file_name} in file list"
        ))
}

/// Link that opens the file or enters the folder
#[must_use]
pub fn main_link_for_file(scope: Option<&Locator>, file_name: &str) -> Locator {
    in_row(".name", scope, file_name, "Main link")
}

/// Inline input shown while renaming
#[must_use]
pub fn rename_input_for_file(scope: Option<&Locator>, file_name: &str) -> Locator {
    in_row("input.filename", scope, file_name, "Rename input")
}

/// Share action of the row
#[must_use]
pub fn share_action_for_file(scope: Option<&Locator>, file_name: &str) -> Locator {
    in_row(".action-share", scope, file_name, "Share action")
}

/// "..." button opening the file actions menu
#[must_use]
pub fn file_actions_menu_button_for_file(scope: Option<&Locator>, file_name: &str) -> Locator {
    in_row(".action-menu", scope, file_name, "File actions menu button")
}

/// The open file actions menu; rendered outside any file list
#[must_use]
pub fn file_actions_menu() -> Locator {
    Locator::for_css(".fileActionsMenu").described_as("File actions menu in file list")
}

fn file_actions_menu_item_for(item_text: &str) -> Locator {
    let expression = XPathBuilder::anywhere("a")
        .filter(Predicate::text_equals(item_text))
        .build();
    Locator::for_xpath(expression)
        .descendant_of(&file_actions_menu())
        .described_as(format!("{item_text} item in file actions menu in file list"))
}

/// "Details" entry of the file actions menu
#[must_use]
pub fn details_menu_item() -> Locator {
    file_actions_menu_item_for("Details")
}

/// "Rename" entry of the file actions menu
#[must_use]
pub fn rename_menu_item() -> Locator {
    file_actions_menu_item_for("Rename")
}

/// "View in folder" entry of the file actions menu
#[must_use]
pub fn view_file_in_folder_menu_item() -> Locator {
    file_actions_menu_item_for("View in folder")
}

// =============================================================================
// STEPS
// =============================================================================

/// Step definitions for the file list
#[derive(Debug, Clone, Copy, Default)]
pub struct FileListSteps;

impl FileListSteps {
    /// Record the file list the current actor works on from now on
    pub fn set_file_list_scope<S: BrowserSession>(
        controller: &mut ScenarioController<S>,
        scope: Option<Locator>,
    ) -> HarnessResult<()> {
        controller.set_scope_for_current_actor(scope)
    }

    /// I create a new folder named `folder_name`
    pub fn create_new_folder<S: BrowserSession>(
        controller: &ScenarioController<S>,
        folder_name: &str,
    ) -> HarnessResult<()> {
        info!(folder = folder_name, "creating folder");
        let scope = controller.current_scope();
        find_long(controller, create_menu_button(scope))?.click()?;
        find_short(controller, create_new_folder_menu_item(scope))?.click()?;
        find_short(controller, create_new_folder_menu_item_name_input(scope))?
            .set_value(&format!("{folder_name}\r"))
    }

    /// I enter in the folder named `folder_name`
    pub fn enter_folder<S: BrowserSession>(
        controller: &ScenarioController<S>,
        folder_name: &str,
    ) -> HarnessResult<()> {
        let scope = controller.current_scope();
        find_long(controller, main_link_for_file(scope, folder_name))?.click()
    }

    /// I open the details view for `file_name`
    pub fn open_details_view<S: BrowserSession>(
        controller: &ScenarioController<S>,
        file_name: &str,
    ) -> HarnessResult<()> {
        let scope = controller.current_scope();
        find_long(controller, file_actions_menu_button_for_file(scope, file_name))?.click()?;
        find_short(controller, details_menu_item())?.click()
    }

    /// I rename `from` to `to`
    pub fn rename<S: BrowserSession>(
        controller: &ScenarioController<S>,
        from: &str,
        to: &str,
    ) -> HarnessResult<()> {
        let scope = controller.current_scope();
        find_long(controller, file_actions_menu_button_for_file(scope, from))?.click()?;
        find_short(controller, rename_menu_item())?.click()?;
        find_long(controller, rename_input_for_file(scope, from))?.set_value(&format!("{to}\r"))
    }

    /// I mark `file_name` as favorite
    pub fn mark_as_favorite<S: BrowserSession>(
        controller: &ScenarioController<S>,
        file_name: &str,
    ) -> HarnessResult<()> {
        let scope = controller.current_scope();
        find_long(controller, favorite_action_for_file(scope, file_name))?.click()
    }

    /// I view `file_name` in folder
    pub fn view_in_folder<S: BrowserSession>(
        controller: &ScenarioController<S>,
        file_name: &str,
    ) -> HarnessResult<()> {
        let scope = controller.current_scope();
        find_long(controller, file_actions_menu_button_for_file(scope, file_name))?.click()?;
        find_short(controller, view_file_in_folder_menu_item())?.click()
    }

    /// I see that the file list is eventually loaded
    pub fn see_file_list_eventually_loaded<S: BrowserSession>(
        controller: &ScenarioController<S>,
    ) -> HarnessResult<()> {
        let session = controller.actor()?;
        let base = controller.config().find_timeout_secs;
        let icon = with_policy(controller, main_working_icon(controller.current_scope()));

        match element_eventually_not_shown(session, &icon, base)? {
            WaitOutcome::Succeeded { .. } => Ok(()),
            WaitOutcome::Cancelled => Err(HarnessError::Cancelled),
            WaitOutcome::TimedOut { .. } => {
                let timeout = base * session.actor().find_timeout_multiplier();
                fail(format!(
                    "The main working icon for the file list is still shown after {timeout} seconds"
                ))
            }
        }
    }

    /// I see that it is not possible to create new files
    ///
    /// A loaded file list always has the create button in the DOM, so its
    /// visibility is what matters.
    pub fn see_not_possible_to_create_new_files<S: BrowserSession>(
        controller: &ScenarioController<S>,
    ) -> HarnessResult<()> {
        let button = find(controller, create_menu_button(controller.current_scope()), None)?;
        assert_false(
            button.is_visible()?,
            &format!("{} is shown", button.describe()),
        )
    }

    /// I see that the file list contains a file named `file_name`
    pub fn see_file_list_contains<S: BrowserSession>(
        controller: &ScenarioController<S>,
        file_name: &str,
    ) -> HarnessResult<()> {
        find_long(controller, row_for_file(controller.current_scope(), file_name)).map(drop)
    }

    /// I see that `file_name` is marked as favorite
    pub fn see_marked_as_favorite<S: BrowserSession>(
        controller: &ScenarioController<S>,
        file_name: &str,
    ) -> HarnessResult<()> {
        let icon = favorited_state_icon_for_file(controller.current_scope(), file_name);
        find_long(controller, icon).map(drop)
    }
}

fn with_policy<S: BrowserSession>(controller: &ScenarioController<S>, locator: Locator) -> Locator {
    locator.with_match_policy(controller.config().match_policy)
}

fn find<S: BrowserSession>(
    controller: &ScenarioController<S>,
    locator: Locator,
    timeout_secs: Option<f64>,
) -> HarnessResult<ElementHandle<'_, S>> {
    let locator = with_policy(controller, locator);
    controller.actor()?.find(&locator, timeout_secs)
}

fn find_long<S: BrowserSession>(
    controller: &ScenarioController<S>,
    locator: Locator,
) -> HarnessResult<ElementHandle<'_, S>> {
    find(controller, locator, Some(controller.config().find_timeout_secs))
}

fn find_short<S: BrowserSession>(
    controller: &ScenarioController<S>,
    locator: Locator,
) -> HarnessResult<ElementHandle<'_, S>> {
    find(controller, locator, Some(controller.config().short_find_timeout_secs))
}
