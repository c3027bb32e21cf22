use crate::backend::events::{topics, EventBus};
use crate::backend::launcher;
use crate::backend::worker::WorkerBackend;
use crate::backend::{self, Backend, BackendError, CommandOutcome, OfflineBackend};
use crate::config::{AppTheme, Config, CONFIG_VERSION};
use crate::core::i18n;
use crate::fl;
use crate::key_binds::key_binds;
use crate::models::backup::{self, BackupInFlight};
use crate::models::log_entry::{LogEntry, LogLevel};
use crate::models::notice::NoticeKind;
use crate::models::project::Project;
use crate::models::repository::Repository;
use crate::nav::NavPage;
use crate::pages::projects::{AppProjectsMessage, PageProjectsView};
use crate::pages::repositories::{add_repository, AppRepositoriesMessage, PageRepositoriesView};
use crate::utils::liveness::{Liveness, LivenessToken};
use cosmic::app::{Core, Task};
use cosmic::cosmic_config::{self, CosmicConfigEntry, Update};
use cosmic::cosmic_theme::{self, ThemeMode};
use cosmic::iced::{
    event,
    keyboard::{Event as KeyEvent, Key, Modifiers},
    stream, Alignment, Event, Length, Subscription,
};
use cosmic::widget::menu::action::MenuAction as _MenuAction;
use cosmic::widget::{self, icon, menu, nav_bar};
use cosmic::{theme, Application, ApplicationExt, Element};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::any::TypeId;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

pub const QUALIFIER: &str = "io";
pub const ORG: &str = "github";
pub const APP: &str = "cosmicpack";
pub const APPID: &str = constcat::concat!(QUALIFIER, ".", ORG, ".", APP);

const REPOSITORY: &str = "https://github.com/cosmicpack/cosmicpack";

#[derive(Clone, Debug)]
pub struct Flags {
    pub config_handler: Option<cosmic_config::Config>,
    pub config: Config,
}

pub struct Cosmicpack {
    core: Core,
    context_page: ContextPage,
    nav: nav_bar::Model,
    dialog_pages: VecDeque<DialogPage>,
    key_binds: HashMap<menu::KeyBind, MenuAction>,
    config: Config,
    config_handler: Option<cosmic_config::Config>,
    modifiers: Modifiers,
    app_themes: Vec<String>,
    language_names: Vec<String>,
    language_codes: Vec<String>,
    /// Mirror of the loader's active language for dependent view state.
    language: String,
    environment_language: Option<String>,
    backend: Arc<dyn Backend>,
    bus: Arc<EventBus>,
    startup_probe: Liveness,
    pub projects_view: PageProjectsView,
    pub repositories_view: PageRepositoriesView,
    placeholder_repository: Option<Repository>,
    toasts: widget::toaster::Toasts<Message>,
    startup_completed: bool,
}

#[derive(Debug, Clone)]
pub enum Message {
    AddRepositoryForm,
    AppLanguage(usize),
    AppTheme(AppTheme),
    CancelProjectBackup,
    CloseToast(widget::ToastId),
    CompleteAddRepository,
    CompleteRemoveDialog(Repository),
    DialogCancel,
    DoneAddRepository(Repository, Result<(), BackendError>),
    DoneProjectBackup(Result<CommandOutcome, BackendError>),
    DoneRemoveRepository(Repository, Result<(), BackendError>),
    Empty,
    EnvironmentLanguageLoaded(String),
    Key(Modifiers, Key),
    LoadProjects,
    LoadRepositories,
    Modifiers(Modifiers),
    OpenExternalUrl(String),
    OpenProjectFolder(String),
    OpenRemoveRepositoryDialog(Repository),
    OpenRepositoriesPage,
    ProjectsLoaded(Result<Vec<Project>, BackendError>),
    ProjectsView(AppProjectsMessage),
    RefreshAll,
    RepositoriesLoaded(Result<Vec<Repository>, BackendError>),
    RepositoriesView(AppRepositoriesMessage),
    SetRepositoryName(String),
    SetRepositoryUrl(String),
    StartProjectBackup(Project),
    StartupCompleted,
    SystemThemeModeChange,
    ToggleContextPage(ContextPage),
    UpdateConfig(Config),
    WorkerErrorLogged(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DialogPage {
    RemoveRepository(Repository),
}

impl Application for Cosmicpack {
    type Executor = cosmic::executor::Default;

    type Flags = Flags;

    type Message = Message;

    const APP_ID: &'static str = APPID;

    fn core(&self) -> &Core {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    fn init(core: Core, flags: Self::Flags) -> (Self, Task<Self::Message>) {
        let bus = EventBus::new();
        let backend: Arc<dyn Backend> = match WorkerBackend::spawn(bus.clone()) {
            Ok(backend) => backend,
            Err(error) => {
                log::error!("starting without backend worker: {error:#}");
                Arc::new(OfflineBackend)
            }
        };

        let mut nav = nav_bar::Model::default();
        let app_themes = vec![fl!("match-desktop"), fl!("dark"), fl!("light")];
        let language_codes = i18n::available_languages();
        let mut language_names = vec![fl!("match-environment")];
        language_names.extend(language_codes.iter().map(|code| i18n::language_label(code)));

        for &nav_page in NavPage::all() {
            let id = nav
                .insert()
                .icon(nav_page.icon())
                .text(nav_page.title())
                .data::<NavPage>(nav_page)
                .id();

            if nav_page == NavPage::default() {
                nav.activate(id);
            }
        }

        let mut app = Cosmicpack {
            core,
            context_page: ContextPage::default(),
            nav,
            dialog_pages: VecDeque::new(),
            key_binds: key_binds(),
            config: flags.config,
            config_handler: flags.config_handler,
            modifiers: Modifiers::empty(),
            app_themes,
            language_names,
            language_codes,
            language: i18n::current_language(),
            environment_language: None,
            backend,
            bus,
            startup_probe: Liveness::new(),
            projects_view: PageProjectsView::default(),
            repositories_view: PageRepositoriesView::default(),
            placeholder_repository: None,
            toasts: widget::toaster::Toasts::new(Message::CloseToast),
            startup_completed: false,
        };

        if let Some(code) = app.config.language.clone() {
            match i18n::apply_language(&code) {
                Ok(applied) => app.language = applied,
                Err(error) => log::warn!("cannot apply configured language {code:?}: {error}"),
            }
        }

        let commands = vec![
            app.update_title(),
            app.update(Message::LoadProjects),
            app.update(Message::LoadRepositories),
            app.update(Message::StartupCompleted),
        ];

        (app, Task::batch(commands))
    }

    fn header_start(&self) -> Vec<Element<Self::Message>> {
        vec![crate::menu::menu_bar(&self.key_binds, self.startup_completed)]
    }

    fn nav_model(&self) -> Option<&nav_bar::Model> {
        Some(&self.nav)
    }

    fn on_escape(&mut self) -> Task<Message> {
        // The backup dialog only closes through the operation's final
        // resolution; its single action is the cancel button.
        if self.projects_view.backup.is_running() {
            return Task::none();
        }

        if self.dialog_pages.pop_front().is_some() {
            return Task::none();
        }

        self.core.window.show_context = false;

        Task::none()
    }

    fn on_app_exit(&mut self) -> Option<Message> {
        self.startup_probe.retire();
        None
    }

    fn context_drawer(&self) -> Option<Element<Self::Message>> {
        if !self.core.window.show_context {
            return None;
        }

        Some(match self.context_page {
            ContextPage::About => self.about(),
            ContextPage::Settings => self.settings(),
            ContextPage::AddRepositoryForm => {
                add_repository(self.placeholder_repository.clone().unwrap_or_default())
            }
        })
    }

    fn dialog(&self) -> Option<Element<Message>> {
        if self.projects_view.backup.is_running() {
            return Some(
                widget::dialog(fl!("backup-header"))
                    .icon(icon::from_name("document-save-symbolic").size(58).icon())
                    .body(fl!("creating-backup"))
                    .secondary_action(
                        widget::button::standard(fl!("cancel"))
                            .on_press(Message::CancelProjectBackup),
                    )
                    .into(),
            );
        }

        let dialog_page = self.dialog_pages.front()?;

        let dialog = match dialog_page {
            DialogPage::RemoveRepository(repository) => {
                widget::dialog(fl!("remove") + " " + { &repository.name })
                    .icon(icon::from_name("dialog-warning-symbolic").size(58).icon())
                    .body(fl!("remove-repository-confirm"))
                    .primary_action(widget::button::destructive(fl!("yes")).on_press_maybe(
                        Some(Message::CompleteRemoveDialog(repository.clone())),
                    ))
                    .secondary_action(
                        widget::button::standard(fl!("cancel")).on_press(Message::DialogCancel),
                    )
            }
        };

        Some(dialog.into())
    }

    fn view(&self) -> Element<Self::Message> {
        let spacing = cosmic::theme::active().cosmic().spacing;
        let entity = self.nav.active();
        let nav_page = self.nav.data::<NavPage>(entity).unwrap_or_default();

        widget::column::with_children(vec![
            widget::toaster(&self.toasts, widget::horizontal_space()),
            nav_page.view(self),
        ])
        .padding([
            spacing.space_none,
            spacing.space_xs,
            spacing.space_none,
            spacing.space_xs,
        ])
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
    }

    fn subscription(&self) -> Subscription<Self::Message> {
        struct ConfigSubscription;
        struct ThemeSubscription;
        struct WorkerEventsSubscription;

        let bus = self.bus.clone();
        let worker_events = Subscription::run_with_id(
            TypeId::of::<WorkerEventsSubscription>(),
            stream::channel(32, move |mut output| async move {
                let (forward, mut forwarded) = futures::channel::mpsc::unbounded();

                // Registrations are owned by this stream: when the
                // subscription winds down, dropping the guards deregisters
                // the handlers.
                let log_forward = forward.clone();
                let _log_registration = bus.subscribe_decoded::<LogEntry>(
                    topics::LOG,
                    "error-log-toast",
                    move |entry| {
                        if entry.level == LogLevel::Error {
                            let _ = log_forward.unbounded_send(Message::WorkerErrorLogged(
                                entry.message,
                            ));
                        }
                    },
                );

                let deep_link_forward = forward.clone();
                let _deep_link_registration = bus.subscribe_keyed(
                    topics::DEEP_LINK_ADD_REPOSITORY,
                    "deep-link-navigation",
                    move |_payload| {
                        let _ = deep_link_forward.unbounded_send(Message::OpenRepositoriesPage);
                    },
                );

                drop(forward);
                while let Some(message) = forwarded.next().await {
                    if output.send(message).await.is_err() {
                        break;
                    }
                }
            }),
        );

        let subscriptions = vec![
            worker_events,
            event::listen_with(|event, status, _| match event {
                Event::Keyboard(KeyEvent::KeyPressed { key, modifiers, .. }) => match status {
                    event::Status::Ignored => Some(Message::Key(modifiers, key)),
                    event::Status::Captured => None,
                },
                Event::Keyboard(KeyEvent::ModifiersChanged(modifiers)) => {
                    Some(Message::Modifiers(modifiers))
                }
                _ => None,
            }),
            cosmic_config::config_subscription(
                TypeId::of::<ConfigSubscription>(),
                Self::APP_ID.into(),
                CONFIG_VERSION,
            )
            .map(|update: Update<ThemeMode>| {
                if !update.errors.is_empty() {
                    log::info!(
                        "Errors loading config {:?}: {:?}",
                        update.keys,
                        update.errors
                    );
                }
                Message::SystemThemeModeChange
            }),
            cosmic_config::config_subscription::<_, cosmic_theme::ThemeMode>(
                TypeId::of::<ThemeSubscription>(),
                cosmic_theme::THEME_MODE_ID.into(),
                cosmic_theme::ThemeMode::version(),
            )
            .map(|update: Update<ThemeMode>| {
                if !update.errors.is_empty() {
                    log::info!(
                        "Errors loading theme mode {:?}: {:?}",
                        update.keys,
                        update.errors
                    );
                }
                Message::SystemThemeModeChange
            }),
        ];

        Subscription::batch(subscriptions)
    }

    #[allow(clippy::too_many_lines)]
    fn update(&mut self, message: Self::Message) -> Task<Self::Message> {
        let mut commands = vec![];
        macro_rules! config_set {
            ($name: ident, $value: expr) => {
                match &self.config_handler {
                    Some(config_handler) => {
                        if let Err(err) =
                            paste::paste! { self.config.[<set_ $name>](config_handler, $value) }
                        {
                            log::warn!("Failed to save config {:?}: {}", stringify!($name), err);
                        }
                    }
                    None => {
                        self.config.$name = $value;
                    }
                }
            };
        }
        match message {
            Message::AppTheme(app_theme) => {
                config_set!(app_theme, app_theme);
                return self.update_config();
            }
            Message::SystemThemeModeChange => {
                return self.update_config();
            }
            Message::AppLanguage(index) => {
                let selection = index
                    .checked_sub(1)
                    .and_then(|position| self.language_codes.get(position))
                    .cloned();
                let target = selection
                    .clone()
                    .or_else(|| self.environment_language.clone());
                if let Some(code) = target {
                    match i18n::apply_language(&code) {
                        Ok(applied) => self.language = applied,
                        Err(error) => log::warn!("cannot apply language {code:?}: {error}"),
                    }
                }
                config_set!(language, selection);
            }
            Message::EnvironmentLanguageLoaded(code) => {
                self.environment_language = Some(code.clone());
                // An explicit language pin in the config outranks the
                // environment's preference.
                if self.config.language.is_none() {
                    match i18n::apply_language(&code) {
                        Ok(applied) => self.language = applied,
                        Err(error) => {
                            log::warn!("cannot apply environment language {code:?}: {error}");
                        }
                    }
                }
            }
            Message::ToggleContextPage(context_page) => {
                if self.context_page == context_page {
                    self.core.window.show_context = !self.core.window.show_context;
                } else {
                    self.context_page = context_page;
                    self.core.window.show_context = true;
                }

                self.set_context_title(context_page.title());
            }
            Message::ProjectsView(message) => match message {
                AppProjectsMessage::BackupProject(project) => {
                    commands.push(self.update(Message::StartProjectBackup(project)));
                }
                AppProjectsMessage::OpenProjectFolder(path) => {
                    commands.push(self.update(Message::OpenProjectFolder(path)));
                }
                AppProjectsMessage::RefreshProjects => {
                    commands.push(self.update(Message::LoadProjects));
                }
            },
            Message::RepositoriesView(message) => match message {
                AppRepositoriesMessage::AddRepository => {
                    commands.push(self.update(Message::AddRepositoryForm));
                }
                AppRepositoriesMessage::OpenRemoveRepositoryDialog(repository) => {
                    commands.push(self.update(Message::OpenRemoveRepositoryDialog(repository)));
                }
                AppRepositoriesMessage::RefreshRepositories => {
                    commands.push(self.update(Message::LoadRepositories));
                }
            },
            Message::RefreshAll => {
                commands.push(self.update(Message::LoadProjects));
                commands.push(self.update(Message::LoadRepositories));
            }
            Message::LoadProjects => {
                commands.push(Task::perform(
                    backend::project_list(self.backend.clone()),
                    |result| cosmic::app::Message::App(Message::ProjectsLoaded(result)),
                ));
            }
            Message::ProjectsLoaded(result) => match result {
                Ok(projects) => self.projects_view.projects = projects,
                Err(error) => {
                    commands.push(self.push_toast(NoticeKind::Error, format!("{error}")));
                }
            },
            Message::LoadRepositories => {
                commands.push(Task::perform(
                    backend::repository_list(self.backend.clone()),
                    |result| cosmic::app::Message::App(Message::RepositoriesLoaded(result)),
                ));
            }
            Message::RepositoriesLoaded(result) => match result {
                Ok(repositories) => self.repositories_view.repositories = repositories,
                Err(error) => {
                    commands.push(self.push_toast(NoticeKind::Error, format!("{error}")));
                }
            },
            Message::StartProjectBackup(project) => {
                if self.projects_view.backup.is_running() {
                    log::warn!("rejecting backup of {}: {}", project.name, BackupInFlight);
                } else {
                    let (cancel, completion) = launcher::call_async_command(
                        &self.backend,
                        backend::commands::PROJECT_CREATE_BACKUP,
                        vec![json!(project.path)],
                        launcher::nop_progress(),
                    );
                    if self.projects_view.backup.begin(cancel).is_ok() {
                        commands.push(Task::perform(completion, |result| {
                            cosmic::app::Message::App(Message::DoneProjectBackup(result))
                        }));
                    }
                }
            }
            Message::CancelProjectBackup => {
                // Only asks the worker to abort; the dialog stays up until
                // the completion future resolves.
                self.projects_view.backup.request_cancel();
            }
            Message::DoneProjectBackup(result) => {
                if self.projects_view.backup.settle() {
                    let kind = backup::completion_notice(&result);
                    let text = match &result {
                        Ok(CommandOutcome::Finished(_)) => fl!("backup-succeeded"),
                        Ok(CommandOutcome::Cancelled) => fl!("backup-cancelled"),
                        Err(error) => fl!("backup-failed", error = error.to_string()),
                    };
                    commands.push(self.push_toast(kind, text));
                } else {
                    log::warn!("backup completion arrived while idle");
                }
            }
            Message::AddRepositoryForm => {
                self.placeholder_repository =
                    Some(Repository::new(String::new(), String::new()));
                commands.push(
                    self.update(Message::ToggleContextPage(ContextPage::AddRepositoryForm)),
                );
            }
            Message::SetRepositoryName(name) => {
                if let Some(ref mut repository_placeholder) = &mut self.placeholder_repository {
                    repository_placeholder.name = name;
                }
            }
            Message::SetRepositoryUrl(url) => {
                if let Some(ref mut repository_placeholder) = &mut self.placeholder_repository {
                    repository_placeholder.url = url;
                }
            }
            Message::CompleteAddRepository => {
                if let Some(repository) = self.placeholder_repository.take() {
                    let added = repository.clone();
                    commands.push(Task::perform(
                        backend::repository_add(self.backend.clone(), repository),
                        move |result| {
                            cosmic::app::Message::App(Message::DoneAddRepository(
                                added.clone(),
                                result,
                            ))
                        },
                    ));
                }
                self.core.window.show_context = false;
            }
            Message::DoneAddRepository(repository, result) => match result {
                Ok(()) => {
                    commands.push(self.push_toast(
                        NoticeKind::Success,
                        fl!("added-repository", name = repository.name),
                    ));
                    commands.push(self.update(Message::LoadRepositories));
                }
                Err(error) => {
                    commands.push(self.push_toast(NoticeKind::Error, format!("{error}")));
                }
            },
            Message::OpenRemoveRepositoryDialog(repository) => {
                if self.dialog_pages.pop_front().is_none() {
                    self.dialog_pages
                        .push_back(DialogPage::RemoveRepository(repository));
                }
            }
            Message::CompleteRemoveDialog(repository) => {
                self.dialog_pages.pop_front();
                let removed = repository.clone();
                commands.push(Task::perform(
                    backend::repository_remove(self.backend.clone(), repository.url),
                    move |result| {
                        cosmic::app::Message::App(Message::DoneRemoveRepository(
                            removed.clone(),
                            result,
                        ))
                    },
                ));
            }
            Message::DoneRemoveRepository(repository, result) => match result {
                Ok(()) => {
                    commands.push(self.push_toast(
                        NoticeKind::Normal,
                        fl!("removed-repository", name = repository.name),
                    ));
                    commands.push(self.update(Message::LoadRepositories));
                }
                Err(error) => {
                    commands.push(self.push_toast(NoticeKind::Error, format!("{error}")));
                }
            },
            Message::DialogCancel => {
                self.dialog_pages.pop_front();
            }
            Message::OpenRepositoriesPage => {
                let entity = self.nav.active();
                // Idempotent: a deep link while already on the page is a
                // no-op.
                if self.nav.data::<NavPage>(entity) != Some(&NavPage::RepositoriesView) {
                    if let Some(entity) = self.nav.entity_at(1) {
                        self.nav.activate(entity);
                        commands.push(self.update_title());
                    }
                }
            }
            Message::WorkerErrorLogged(message) => {
                commands.push(self.push_toast(NoticeKind::Error, message));
            }
            Message::OpenProjectFolder(path) => {
                _ = open::that_detached(path);
            }
            Message::OpenExternalUrl(url) => {
                _ = open::that_detached(url);
            }
            Message::Key(modifiers, key) => {
                for (key_bind, menu_action) in &self.key_binds {
                    if key_bind.matches(modifiers, &key) {
                        return self.update(menu_action.message());
                    }
                }
            }
            Message::Modifiers(modifiers) => {
                self.modifiers = modifiers;
            }
            Message::UpdateConfig(config) => {
                self.config = config;
            }
            Message::CloseToast(id) => {
                self.toasts.remove(id);
            }
            Message::StartupCompleted => {
                let backend = self.backend.clone();
                commands.push(Task::perform(
                    backend::environment_language(backend),
                    |result| {
                        cosmic::app::Message::App(match result {
                            Ok(code) => Message::EnvironmentLanguageLoaded(code),
                            Err(error) => {
                                log::warn!("failed to query environment language: {error}");
                                Message::Empty
                            }
                        })
                    },
                ));

                let backend = self.backend.clone();
                let probe = self.startup_probe.token();
                commands.push(Task::perform(
                    startup_deep_link_probe(backend, probe),
                    |navigate| {
                        cosmic::app::Message::App(if navigate {
                            Message::OpenRepositoriesPage
                        } else {
                            Message::Empty
                        })
                    },
                ));
                self.startup_completed = true;
            }
            Message::Empty => {
                commands.push(Task::none());
            }
        }
        Task::batch(commands)
    }

    fn on_nav_select(&mut self, id: nav_bar::Id) -> Task<Self::Message> {
        self.nav.activate(id);
        self.update_title()
    }
}

impl Cosmicpack {
    #[allow(clippy::unused_self)]
    pub fn about(&self) -> Element<Message> {
        let spacing = theme::active().cosmic().spacing;

        let release = env!("CARGO_PKG_VERSION");
        let hash = env!("VERGEN_GIT_SHA");
        let short_hash: String = hash.chars().take(7).collect();
        let date = env!("VERGEN_GIT_COMMIT_DATE");

        widget::column::with_children(vec![
            widget::text::title3(fl!("cosmicpack")).into(),
            widget::button::link(REPOSITORY)
                .on_press(Message::OpenExternalUrl(REPOSITORY.to_string()))
                .padding(spacing.space_none)
                .into(),
            widget::button::link(fl!(
                "git-description",
                hash = short_hash.as_str(),
                date = date
            ))
            .on_press(Message::OpenExternalUrl(format!(
                "{REPOSITORY}/commits/{hash}"
            )))
            .padding(spacing.space_none)
            .into(),
            widget::text::caption(format!("v{release}")).into(),
        ])
        .align_x(Alignment::Center)
        .spacing(spacing.space_xxs)
        .width(Length::Fill)
        .into()
    }

    fn settings(&self) -> Element<Message> {
        let language_selected = self
            .config
            .language
            .as_ref()
            .and_then(|code| {
                self.language_codes
                    .iter()
                    .position(|candidate| candidate == code)
                    .map(|position| position + 1)
            })
            .unwrap_or(0);

        widget::settings::view_column(vec![
            widget::settings::section()
                .title(fl!("appearance"))
                .add({
                    let app_theme_selected = match self.config.app_theme {
                        AppTheme::Dark => 1,
                        AppTheme::Light => 2,
                        AppTheme::System => 0,
                    };
                    widget::settings::item::builder(fl!("theme")).control(widget::dropdown(
                        &self.app_themes,
                        Some(app_theme_selected),
                        move |index| {
                            Message::AppTheme(match index {
                                1 => AppTheme::Dark,
                                2 => AppTheme::Light,
                                _ => AppTheme::System,
                            })
                        },
                    ))
                })
                .into(),
            widget::settings::section()
                .title(fl!("language"))
                .add(
                    widget::settings::item::builder(fl!("language"))
                        .description(i18n::language_label(&self.language))
                        .control(widget::dropdown(
                            &self.language_names,
                            Some(language_selected),
                            Message::AppLanguage,
                        )),
                )
                .into(),
        ])
        .into()
    }

    fn update_config(&mut self) -> Task<Message> {
        let theme = self.config.app_theme.theme();
        cosmic::app::command::set_theme(theme)
    }

    pub fn update_title(&mut self) -> Task<Message> {
        let window_title = match self.nav.text(self.nav.active()) {
            Some(page) => format!("{page} — {}", fl!("cosmicpack")),
            _ => fl!("cosmicpack"),
        };
        self.set_window_title(window_title)
    }

    fn push_toast(&mut self, kind: NoticeKind, message: impl Into<String>) -> Task<Message> {
        let message = message.into();
        if kind == NoticeKind::Error {
            log::error!("{message}");
        }
        self.toasts
            .push(widget::toaster::Toast::new(message))
            .map(cosmic::app::Message::App)
    }
}

/// One-shot startup check for a pending deep-link request. The probe token
/// turns a resolution that arrives after teardown into a silent no-op.
async fn startup_deep_link_probe(backend: Arc<dyn Backend>, probe: LivenessToken) -> bool {
    match backend::deep_link_has_add_repository(backend).await {
        Ok(pending) => {
            if pending && !probe.is_live() {
                log::debug!("deep-link probe resolved after teardown; ignoring");
                return false;
            }
            pending
        }
        Err(error) => {
            log::warn!("deep-link probe failed: {error}");
            false
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ContextPage {
    #[default]
    About,
    AddRepositoryForm,
    Settings,
}

impl ContextPage {
    fn title(self) -> String {
        match self {
            Self::About => fl!("about"),
            Self::Settings => fl!("settings"),
            Self::AddRepositoryForm => fl!("add-repository"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MenuAction {
    About,
    AddRepository,
    Empty,
    Refresh,
    Settings,
}

impl _MenuAction for MenuAction {
    type Message = Message;

    fn message(&self) -> Self::Message {
        match self {
            MenuAction::About => Message::ToggleContextPage(ContextPage::About),
            MenuAction::Empty => Message::Empty,
            MenuAction::AddRepository => Message::AddRepositoryForm,
            MenuAction::Settings => Message::ToggleContextPage(ContextPage::Settings),
            MenuAction::Refresh => Message::RefreshAll,
        }
    }
}
