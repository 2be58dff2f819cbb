use crate::domain::model::{
    AuthMethod, Collection, Column, HttpMethod, OutputPaths, QueryParam, TransformResult,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 給日誌與結果摘要使用的完整路徑
    fn location(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn method(&self) -> HttpMethod;
    fn credential_var(&self) -> &str;
    fn auth(&self) -> AuthMethod;
    fn query_param(&self) -> &str;
    fn terms(&self) -> &[String];
    fn parameters(&self) -> Vec<QueryParam>;
    fn request_delay(&self) -> Duration;
    fn timeout(&self) -> Duration;

    fn items_path(&self) -> Option<&str>;
    fn columns(&self) -> &[Column];

    fn output_path(&self) -> &str;
    fn raw_file(&self) -> &str;
    fn table_file(&self) -> &str;
    fn delimiter(&self) -> u8;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Collection>;
    async fn transform(&self, collection: &Collection) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<OutputPaths>;
}
