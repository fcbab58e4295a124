//! Shared fixtures: a scripted file list page on top of `MockSession`.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use acceptance_kit::file_list;
use acceptance_kit::mock::MockSession;
use acceptance_kit::{BrowserSession, ElementRef, HarnessConfig, Locator, ScenarioController};

/// Fast timeouts so failing steps fail quickly
pub fn fast_config() -> HarnessConfig {
    HarnessConfig::default()
        .with_find_timeout_secs(1.0)
        .with_short_find_timeout_secs(0.5)
        .with_poll_interval_ms(10)
}

/// Scope locator of a page's file list container
pub fn container(id: &str) -> Locator {
    Locator::for_css(format!("#{id}")).described_as(format!("File list in #{id}"))
}

/// A file list page: create menu, rows with actions and a file actions menu.
///
/// Clicks and typed values are scripted the way the real page reacts to them.
#[derive(Debug, Clone)]
pub struct FilesPage {
    pub dom: MockSession,
    pub container: ElementRef,
    pub create_button: ElementRef,
    pub name_input: ElementRef,
    pub spinner: ElementRef,
    pub actions_menu: ElementRef,
    pub sidebar: ElementRef,
    table: ElementRef,
    active_row: Arc<Mutex<Option<(ElementRef, String)>>>,
}

impl FilesPage {
    /// Build the page inside `#container_id` with one row per file
    pub fn new(container_id: &str, files: &[&str]) -> Self {
        Self::in_document(MockSession::new(), container_id, files)
    }

    /// Build the page in an existing document
    pub fn in_document(dom: MockSession, container_id: &str, files: &[&str]) -> Self {
        let container = dom.append(dom.root(), "div").id(container_id).build();
        let controls = dom.append(container, "div").id("controls").build();
        let create_button = dom.append(controls, "a").class("button").class("new").build();

        let menu = dom.append(controls, "div").class("newFileMenu").hidden().build();
        let list = dom.append(menu, "ul").build();
        let _ = dom.append(list, "li").build();
        let folder_item = dom.append(list, "li").build();
        let _ = dom.append(folder_item, "span").text("New folder").build();
        let form = dom.append(folder_item, "form").class("filenameform").hidden().build();
        let name_input = dom.append(form, "input").attr("type", "text").build();

        let table = dom.append(container, "tbody").id("fileList").build();
        let spinner = dom.append(container, "div").class("mask").class("icon-loading").build();

        let actions_menu = dom.append(dom.root(), "div").class("fileActionsMenu").hidden().build();
        let sidebar = dom.append(dom.root(), "div").id("app-sidebar").hidden().build();

        let page = Self {
            dom: dom.clone(),
            container,
            create_button,
            name_input,
            spinner,
            actions_menu,
            sidebar,
            table,
            active_row: Arc::new(Mutex::new(None)),
        };

        dom.on_click(create_button, move |dom| dom.set_visible(menu, true));
        dom.bind_locator(&file_list::create_new_folder_menu_item(None), [folder_item]);
        dom.on_click(folder_item, move |dom| dom.set_visible(form, true));
        {
            let page = page.clone();
            dom.on_set_value(name_input, move |dom, value| {
                if let Some(name) = value.strip_suffix('\r') {
                    let _ = page.add_row(name);
                    dom.set_visible(form, false);
                    dom.set_visible(menu, false);
                }
            });
        }

        page.build_actions_menu();
        for file in files {
            let _ = page.add_row(file);
        }
        page
    }

    fn build_actions_menu(&self) {
        let dom = &self.dom;
        let entries = dom.append(self.actions_menu, "ul").build();
        for label in ["Details", "Rename", "View in folder"] {
            let item = dom.append(entries, "li").build();
            let link = dom.append(item, "a").text(label).build();
            let locator = match label {
                "Details" => file_list::details_menu_item(),
                "Rename" => file_list::rename_menu_item(),
                _ => file_list::view_file_in_folder_menu_item(),
            };
            dom.bind_locator(&locator, [link]);

            let page = self.clone();
            dom.on_click(link, move |dom| {
                dom.set_visible(page.actions_menu, false);
                match label {
                    "Details" => dom.set_visible(page.sidebar, true),
                    "Rename" => page.start_rename(),
                    _ => {}
                }
            });
        }
    }

    /// Append a row for `name`; returns the row
    pub fn add_row(&self, name: &str) -> ElementRef {
        let dom = &self.dom;
        let row = dom.append(self.table, "tr").attr("data-file", name).build();
        let cell = dom.append(row, "td").class("filename").build();
        let link = dom.append(cell, "a").class("name").build();
        let _ = dom.append(link, "span").class("nametext").text(name).build();
        let actions = dom.append(cell, "span").class("fileactions").build();
        let _ = dom.append(actions, "a").class("action-share").build();
        let menu_button = dom.append(actions, "a").class("action-menu").build();
        let favorite = dom.append(row, "a").class("action-favorite").build();

        dom.bind_locator(&file_list::row_for_file(None, name), [row]);

        let starred = Arc::new(AtomicBool::new(false));
        dom.on_click(favorite, move |dom| {
            if !starred.swap(true, Ordering::SeqCst) {
                let _ = dom.append(favorite, "span").class("icon-starred").build();
            }
        });

        let page = self.clone();
        let name = name.to_string();
        dom.on_click(menu_button, move |dom| {
            *page.active_row.lock().unwrap() = Some((row, name.clone()));
            dom.set_visible(page.actions_menu, true);
        });
        row
    }

    fn start_rename(&self) {
        let Some((row, _)) = self.active_row.lock().unwrap().clone() else {
            return;
        };
        let input = self.dom.append(row, "input").class("filename").build();
        let page = self.clone();
        self.dom.on_set_value(input, move |dom, value| {
            if let Some(new_name) = value.strip_suffix('\r') {
                dom.remove(row);
                let _ = page.add_row(new_name);
            }
        });
    }

    /// Remove the loading spinner after `delay`, from another thread
    pub fn finish_loading_after(&self, delay: Duration) {
        let dom = self.dom.clone();
        let spinner = self.spinner;
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            dom.remove(spinner);
        });
    }

    /// Names of the rows currently shown, in document order
    pub fn file_names(&self) -> Vec<String> {
        let rows = self
            .dom
            .resolve(&Locator::for_css("#fileList .nametext"))
            .unwrap();
        rows.into_iter()
            .map(|span| self.dom.text(span).unwrap())
            .collect()
    }
}

/// Controller with one actor per `(name, page)`, all on fast timeouts
pub fn controller_with(
    config: HarnessConfig,
    actors: &[(&str, &MockSession)],
) -> ScenarioController<MockSession> {
    let mut controller = ScenarioController::new(config);
    for (name, dom) in actors {
        controller.add_session(name, (*dom).clone());
    }
    controller
}
