use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{PostId, UserId};

type Filter<T> = Box<dyn Fn(T) -> T + Send + Sync>;
type TitleFilter = Box<dyn Fn(String, &str, NaiveDate) -> String + Send + Sync>;
type PostObserver = Box<dyn Fn(&PostResult) + Send + Sync>;

/// Outcome of one post creation, as seen by the observer hook.
pub type PostResult = Result<PostId>;

/// Site customisation points. Every hook is optional; an unset hook leaves
/// the value it is given untouched.
#[derive(Default)]
pub struct Hooks {
    before_content: Option<Filter<String>>,
    after_content: Option<Filter<String>>,
    post_content: Option<Filter<String>>,
    list_class: Option<Filter<String>>,
    date_format: Option<Filter<String>>,
    title_phrase: Option<Filter<String>>,
    post_title: Option<TitleFilter>,
    author_id: Option<Filter<Option<UserId>>>,
    admin_url: Option<Filter<Option<String>>>,
    schedule: Option<Filter<String>>,
    new_post: Option<PostObserver>,
}

fn apply<T>(filter: &Option<Filter<T>>, value: T) -> T {
    match filter {
        Some(filter) => filter(value),
        None => value,
    }
}

impl Hooks {
    /// Markup placed before the list; receives an empty string.
    pub fn before_content(mut self, f: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.before_content = Some(Box::new(f));
        self
    }

    /// Markup placed after the list; receives an empty string.
    pub fn after_content(mut self, f: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.after_content = Some(Box::new(f));
        self
    }

    /// Final transform over the whole rendered post body.
    pub fn post_content(mut self, f: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.post_content = Some(Box::new(f));
        self
    }

    pub fn list_class(mut self, f: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.list_class = Some(Box::new(f));
        self
    }

    pub fn date_format(mut self, f: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.date_format = Some(Box::new(f));
        self
    }

    pub fn title_phrase(mut self, f: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.title_phrase = Some(Box::new(f));
        self
    }

    /// Sees the computed title, the post body and the bucket's day.
    pub fn post_title(
        mut self,
        f: impl Fn(String, &str, NaiveDate) -> String + Send + Sync + 'static,
    ) -> Self {
        self.post_title = Some(Box::new(f));
        self
    }

    /// Receives the first administrator's id, if any.
    pub fn author_id(
        mut self,
        f: impl Fn(Option<UserId>) -> Option<UserId> + Send + Sync + 'static,
    ) -> Self {
        self.author_id = Some(Box::new(f));
        self
    }

    /// Receives the stored TNG admin URL, if any.
    pub fn admin_url(
        mut self,
        f: impl Fn(Option<String>) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.admin_url = Some(Box::new(f));
        self
    }

    pub fn schedule(mut self, f: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.schedule = Some(Box::new(f));
        self
    }

    pub fn on_new_post(mut self, f: impl Fn(&PostResult) + Send + Sync + 'static) -> Self {
        self.new_post = Some(Box::new(f));
        self
    }

    pub(crate) fn apply_before_content(&self) -> String {
        apply(&self.before_content, String::new())
    }

    pub(crate) fn apply_after_content(&self) -> String {
        apply(&self.after_content, String::new())
    }

    pub(crate) fn apply_post_content(&self, content: String) -> String {
        apply(&self.post_content, content)
    }

    pub(crate) fn apply_list_class(&self, class: String) -> String {
        apply(&self.list_class, class)
    }

    pub(crate) fn apply_date_format(&self, format: String) -> String {
        apply(&self.date_format, format)
    }

    pub(crate) fn apply_title_phrase(&self, phrase: String) -> String {
        apply(&self.title_phrase, phrase)
    }

    pub(crate) fn apply_post_title(&self, title: String, content: &str, day: NaiveDate) -> String {
        match &self.post_title {
            Some(filter) => filter(title, content, day),
            None => title,
        }
    }

    pub(crate) fn apply_author_id(&self, author: Option<UserId>) -> Option<UserId> {
        apply(&self.author_id, author)
    }

    pub(crate) fn apply_admin_url(&self, url: Option<String>) -> Option<String> {
        apply(&self.admin_url, url)
    }

    pub(crate) fn apply_schedule(&self, schedule: String) -> String {
        apply(&self.schedule, schedule)
    }

    pub(crate) fn notify_new_post(&self, result: &PostResult) {
        if let Some(observer) = &self.new_post {
            observer(result);
        }
    }
}
