use cosmic::{widget::icon, Element};

use crate::{app, fl};

#[derive(Clone, Copy, Default, Debug, Eq, PartialEq)]
pub enum NavPage {
    #[default]
    ProjectsView,
    RepositoriesView,
}

impl Default for &NavPage {
    fn default() -> Self {
        &NavPage::ProjectsView
    }
}

impl NavPage {
    pub fn title(&self) -> String {
        match self {
            Self::ProjectsView => fl!("projects-page-title"),
            Self::RepositoriesView => fl!("repositories-page-title"),
        }
    }
    pub fn icon(&self) -> cosmic::widget::Icon {
        match self {
            Self::ProjectsView => icon::from_name("folder-symbolic").icon(),
            Self::RepositoriesView => icon::from_name("folder-remote-symbolic").icon(),
        }
    }

    pub fn view<'a>(&self, app: &'a app::Cosmicpack) -> Element<'a, app::Message> {
        match self {
            NavPage::ProjectsView => app.projects_view.view().map(app::Message::ProjectsView),
            NavPage::RepositoriesView => app
                .repositories_view
                .view()
                .map(app::Message::RepositoriesView),
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::ProjectsView, Self::RepositoriesView]
    }
}
