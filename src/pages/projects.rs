use cosmic::{
    iced::{Alignment, Length},
    theme, widget, Apply, Element,
};

use crate::fl;
use crate::models::backup::BackupState;
use crate::models::project::Project;

#[derive(Debug, Clone)]
pub enum AppProjectsMessage {
    BackupProject(Project),
    OpenProjectFolder(String),
    RefreshProjects,
}

#[derive(Default)]
pub struct PageProjectsView {
    pub projects: Vec<Project>,
    pub backup: BackupState,
}

impl PageProjectsView {
    pub fn view(&self) -> Element<'_, AppProjectsMessage> {
        let spacing = theme::active().cosmic().spacing;

        if self.projects.is_empty() {
            return widget::column::with_children(vec![
                widget::text::title3(fl!("no-projects")).into(),
                widget::button::standard(fl!("refresh"))
                    .on_press(AppProjectsMessage::RefreshProjects)
                    .into(),
            ])
            .spacing(spacing.space_xs)
            .align_x(Alignment::Center)
            .width(Length::Fill)
            .into();
        }

        let mut projects = widget::list::list_column().spacing(spacing.space_xxxs);
        for project in &self.projects {
            // One backup at a time: the per-row action disappears while a
            // backup is in flight.
            let backup_button = widget::button::standard(fl!("back-up")).on_press_maybe(
                (!self.backup.is_running())
                    .then(|| AppProjectsMessage::BackupProject(project.clone())),
            );

            let details = widget::column::with_children(vec![
                widget::text::body(&project.name).into(),
                widget::text::caption(&project.path).into(),
            ])
            .spacing(spacing.space_xxxs);

            let row = widget::row::with_capacity(4)
                .align_y(Alignment::Center)
                .spacing(spacing.space_xs)
                .padding([spacing.space_xxs, spacing.space_xs])
                .push(details)
                .push(widget::horizontal_space())
                .push(backup_button)
                .push(
                    widget::button::standard(fl!("open-folder")).on_press(
                        AppProjectsMessage::OpenProjectFolder(project.path.clone()),
                    ),
                );

            projects = projects.add(row);
        }

        projects
            .apply(widget::scrollable)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}
