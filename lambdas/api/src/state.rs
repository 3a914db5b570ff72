use std::sync::Arc;

use aws_config::SdkConfig;
use domain::{
    accounts::{AccountService, DynamoAccountRepository},
    identity::GoTrueClient,
    pharmacies::{DynamoPharmacyRepository, PharmacyDirectory},
    requests::{cqrs, RequestWorkflow, Services},
    storage::{S3ObjectStore, Uploader},
};

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub requests: RequestWorkflow,
    pub pharmacies: PharmacyDirectory,
}

impl AppState {
    pub fn new(
        accounts: AccountService,
        requests: RequestWorkflow,
        pharmacies: PharmacyDirectory,
    ) -> Self {
        Self {
            accounts,
            requests,
            pharmacies,
        }
    }

    /// Wires the DynamoDB, S3 and GoTrue adapters.
    pub fn from_aws(config: &Config, sdk: &SdkConfig) -> Self {
        let dynamodb = aws_sdk_dynamodb::Client::new(sdk);
        let s3 = aws_sdk_s3::Client::new(sdk);

        let account_repo = Arc::new(DynamoAccountRepository::from_env(dynamodb.clone()));
        let identity = Arc::new(GoTrueClient::new(
            config.supabase_url.clone(),
            config.supabase_anon_key.clone(),
        ));
        let uploader = Uploader::new(Arc::new(S3ObjectStore::new(
            s3,
            config.buckets.clone(),
            config.signed_url_ttl,
        )));

        let views = cqrs::init_repo(dynamodb.clone());
        let index = cqrs::init_index(dynamodb.clone());
        let commands = cqrs::init(
            dynamodb.clone(),
            views.clone(),
            Services::new(config.accept_policy),
        );

        let requests = RequestWorkflow::new(commands, views, index, account_repo.clone());
        let accounts = AccountService::new(account_repo, identity, uploader);
        let pharmacies =
            PharmacyDirectory::new(Arc::new(DynamoPharmacyRepository::from_env(dynamodb)));

        Self::new(accounts, requests, pharmacies)
    }
}
