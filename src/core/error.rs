use thiserror::Error;

/// 弹药盒模组的错误分类。
///
/// 逐字段 / 逐属性的操作都是尽力而为：出错只影响当前字段，记录日志后继续。
/// 只有 `TemplateCopyFailure` 与 `RegistrationFailure` 会中止整个会话。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoxError {
    #[error("no settable attribute `{0}`")]
    AttributeNotFound(String),
    #[error("cannot coerce {found} into {expected} for `{name}`")]
    TypeCoercionFailure {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("stat table lacks `{0}`")]
    MissingCapability(&'static str),
    #[error("could not load asset {0}")]
    AssetLoadFailure(String),
    #[error("could not copy item template #{0}")]
    TemplateCopyFailure(i32),
    #[error("could not register item #{0}")]
    RegistrationFailure(i32),
    #[error("host call `{call}` failed: {reason}")]
    HostFault { call: String, reason: String },
}

impl BoxError {
    pub fn host_fault(call: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HostFault {
            call: call.into(),
            reason: reason.into(),
        }
    }

    /// 是否属于会中止本次会话的错误
    pub fn aborts_session(&self) -> bool {
        matches!(
            self,
            Self::TemplateCopyFailure(_) | Self::RegistrationFailure(_)
        )
    }
}
