#![forbid(unsafe_code)]

pub mod app_services;
pub mod content_service;
pub mod error;
pub mod generation;
pub mod mindmap_service;
pub mod notify;
pub mod progress_service;
pub mod sessions;
pub mod study_item_service;

pub use tellect_core::Clock;

pub use app_services::AppServices;
pub use content_service::{ContentService, SavedContent};
pub use error::{
    AppServicesError, ContentServiceError, GenerationError, MindmapServiceError,
    ProgressServiceError, SessionError, StudyItemServiceError,
};
pub use generation::{
    ContentKind, GeneratedFlashcard, GeneratedFlashcards, GeneratedMindmap, GenerationConfig,
    GenerationService,
};
pub use mindmap_service::MindmapService;
pub use notify::{LogNotifier, MemoryNotifier, Notice, NoticeLevel, Notifier};
pub use progress_service::{Dashboard, ProgressService};
pub use sessions::{ActiveSession, SessionAnswerResult, StudyLoopService};
pub use study_item_service::StudyItemService;
