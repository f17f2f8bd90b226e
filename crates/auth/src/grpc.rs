// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;

use async_trait::async_trait;
use carwash_api::pb::auth::v1::{
    DeleteProfileRequest, GetProfileRequest, ListProfilesRequest, ListProfilesResponse,
    MessageResponse, Profile, RegisterRequest, UpdateProfileRequest,
    auth_server::{Auth, AuthServer},
};
use carwash_server::grpc::{GrpcServerConfig, GrpcServiceHandler};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, service::RoutesBuilder};
use tonic_health::server::HealthReporter;

use crate::service::AuthService;

#[async_trait]
impl Auth for AuthService {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> std::result::Result<Response<Profile>, Status> {
        let profile = AuthService::register(self, request.into_inner()).await?;
        Ok(Response::new(profile))
    }

    async fn get_profile(
        &self,
        request: Request<GetProfileRequest>,
    ) -> std::result::Result<Response<Profile>, Status> {
        let profile = AuthService::get_profile(self, &request.into_inner().id).await?;
        Ok(Response::new(profile))
    }

    async fn list_profiles(
        &self,
        request: Request<ListProfilesRequest>,
    ) -> std::result::Result<Response<ListProfilesResponse>, Status> {
        let req = request.into_inner();
        let profiles = AuthService::list_profiles(self, req.limit, req.offset).await?;
        Ok(Response::new(ListProfilesResponse { profiles }))
    }

    async fn update_profile(
        &self,
        request: Request<UpdateProfileRequest>,
    ) -> std::result::Result<Response<Profile>, Status> {
        let profile = AuthService::update_profile(self, request.into_inner()).await?;
        Ok(Response::new(profile))
    }

    async fn delete_profile(
        &self,
        request: Request<DeleteProfileRequest>,
    ) -> std::result::Result<Response<MessageResponse>, Status> {
        AuthService::delete_profile(self, &request.into_inner().id).await?;
        Ok(Response::new(MessageResponse {
            message: "profile deleted".to_string(),
        }))
    }
}

#[async_trait]
impl GrpcServiceHandler for AuthService {
    fn service_name(&self) -> &'static str { "Auth" }

    fn file_descriptor_set(&self) -> &'static [u8] { carwash_api::pb::GRPC_DESC }

    fn register_service(self: &Arc<Self>, builder: &mut RoutesBuilder, config: &GrpcServerConfig) {
        builder.add_service(
            AuthServer::from_arc(self.clone())
                .max_decoding_message_size(config.max_recv_message_size)
                .max_encoding_message_size(config.max_send_message_size),
        );
    }

    async fn readiness_reporting(
        self: &Arc<Self>,
        _cancellation_token: CancellationToken,
        reporter: HealthReporter,
    ) {
        reporter.set_serving::<AuthServer<Self>>().await;
    }
}

#[cfg(test)]
mod tests {
    use carwash_api::pb::auth::v1::auth_client::AuthClient;
    use carwash_server::grpc::start_grpc_server;
    use tonic::Code;

    use super::*;
    use crate::service::tests::{register_request, service};

    async fn get_available_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_profile_rpcs_over_the_wire() {
        let port = get_available_port().await;
        let config = GrpcServerConfig::builder()
            .bind_address(format!("127.0.0.1:{port}"))
            .build();
        let mut handle = start_grpc_server(config, vec![Arc::new(service().await)])
            .await
            .unwrap();
        handle.wait_for_start().await.unwrap();

        let mut client = None;
        for _ in 0..50 {
            if let Ok(c) = AuthClient::connect(format!("http://127.0.0.1:{port}")).await {
                client = Some(c);
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        let mut client = client.unwrap();

        let profile = client
            .register(register_request("a@b.com", "x"))
            .await
            .unwrap()
            .into_inner();
        let fetched = client
            .get_profile(GetProfileRequest {
                id: profile.id.clone(),
            })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(fetched, profile);

        let status = client
            .register(register_request("a@b.com", "x"))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::AlreadyExists);

        client
            .delete_profile(DeleteProfileRequest {
                id: profile.id.clone(),
            })
            .await
            .unwrap();
        let status = client
            .get_profile(GetProfileRequest { id: profile.id })
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);

        let listed = client
            .list_profiles(ListProfilesRequest::default())
            .await
            .unwrap()
            .into_inner();
        assert!(listed.profiles.is_empty());

        handle.shutdown();
        handle.wait_for_stop().await.unwrap();
    }
}
