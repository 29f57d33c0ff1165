pub mod article;
pub mod purchase;

pub use article::{Article, ArticleContent, ArticleSummary};
pub use purchase::{
    ContentAccessRequest, NewPurchase, Purchase, VerifyPurchaseRequest, VerifyPurchaseResponse,
};
