use cosmic::{
    iced::{Alignment, Length},
    theme, widget, Apply, Element,
};

use crate::app::Message;
use crate::fl;
use crate::models::repository::Repository;

#[derive(Debug, Clone)]
pub enum AppRepositoriesMessage {
    AddRepository,
    OpenRemoveRepositoryDialog(Repository),
    RefreshRepositories,
}

#[derive(Default)]
pub struct PageRepositoriesView {
    pub repositories: Vec<Repository>,
}

impl PageRepositoriesView {
    pub fn view(&self) -> Element<'_, AppRepositoriesMessage> {
        let spacing = theme::active().cosmic().spacing;

        if self.repositories.is_empty() {
            return widget::column::with_children(vec![
                widget::text::title3(fl!("no-repositories")).into(),
                widget::button::standard(fl!("add-repository"))
                    .on_press(AppRepositoriesMessage::AddRepository)
                    .into(),
                widget::button::standard(fl!("refresh"))
                    .on_press(AppRepositoriesMessage::RefreshRepositories)
                    .into(),
            ])
            .spacing(spacing.space_xs)
            .align_x(Alignment::Center)
            .width(Length::Fill)
            .into();
        }

        let header = widget::row::with_capacity(2)
            .push(widget::horizontal_space())
            .push(
                widget::button::standard(fl!("add-repository"))
                    .on_press(AppRepositoriesMessage::AddRepository),
            );

        let mut repositories = widget::list::list_column().spacing(spacing.space_xxxs);
        for repository in &self.repositories {
            let details = widget::column::with_children(vec![
                widget::text::body(&repository.name).into(),
                widget::text::caption(&repository.url).into(),
            ])
            .spacing(spacing.space_xxxs);

            let row = widget::row::with_capacity(3)
                .align_y(Alignment::Center)
                .spacing(spacing.space_xs)
                .padding([spacing.space_xxs, spacing.space_xs])
                .push(details)
                .push(widget::horizontal_space())
                .push(widget::button::destructive(fl!("remove")).on_press(
                    AppRepositoriesMessage::OpenRemoveRepositoryDialog(repository.clone()),
                ));

            repositories = repositories.add(row);
        }

        widget::column::with_capacity(2)
            .spacing(spacing.space_xs)
            .push(header)
            .push(
                repositories
                    .apply(widget::scrollable)
                    .width(Length::Fill)
                    .height(Length::Fill),
            )
            .into()
    }
}

/// Context-drawer form for a new repository.
pub fn add_repository<'a>(repository: Repository) -> Element<'a, Message> {
    let spacing = theme::active().cosmic().spacing;

    widget::column::with_children(vec![
        widget::text_input(fl!("repository-name"), repository.name.clone())
            .on_input(Message::SetRepositoryName)
            .into(),
        widget::text_input(fl!("repository-url"), repository.url.clone())
            .on_input(Message::SetRepositoryUrl)
            .into(),
        widget::button::standard(fl!("add"))
            .on_press_maybe(
                (!repository.url.is_empty()).then_some(Message::CompleteAddRepository),
            )
            .into(),
    ])
    .spacing(spacing.space_xs)
    .into()
}
