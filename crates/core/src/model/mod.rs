mod ai_settings;
mod ids;
mod mindmap;
mod profile;
mod study_item;
mod study_record;
mod subject;

pub use ai_settings::{
    AiSettings, AiSettingsDraft, AiSettingsError, DEFAULT_AI_BASE_URL, DEFAULT_AI_MODEL,
};
pub use ids::{ItemId, MindmapId, ParseIdError, UserId};

pub use mindmap::{
    Mindmap, MindmapDraft, MindmapEdge, MindmapError, MindmapNode, NodeKind, NodePosition,
};
pub use profile::Profile;
pub use study_item::{StudyItem, StudyItemDraft, StudyItemError, StudyStats};
pub use study_record::{SessionKind, StudySessionRecord, StudySessionRecordError};
pub use subject::{Difficulty, Subject, SubjectParseError};
