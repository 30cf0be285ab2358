//! Terraform descriptor rendering.

use std::fmt::Write as _;

use tracing::debug;

use pgforge_spec::{GenerationRequest, REPLICA_CEILING};

use crate::error::{IacError, IacResult};
use crate::hcl::{check_structure, quote};
use crate::provider::InfraSettings;

/// Renders the Terraform descriptor for a PostgreSQL cluster: one primary
/// instance plus one instance per replica.
#[derive(Debug, Clone, Default)]
pub struct TerraformRenderer {
    settings: InfraSettings,
}

impl TerraformRenderer {
    /// Create a renderer, rejecting unusable settings.
    pub fn new(settings: InfraSettings) -> IacResult<Self> {
        settings.check()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &InfraSettings {
        &self.settings
    }

    /// Render `main.tf` for a validated request.
    pub fn render(&self, request: &GenerationRequest) -> IacResult<String> {
        if request.num_replicas() > REPLICA_CEILING {
            return Err(IacError::Render(format!(
                "{} replicas exceeds the ceiling of {}",
                request.num_replicas(),
                REPLICA_CEILING
            )));
        }

        let instance_type = quote(request.instance_type().as_str());
        let mut out = String::new();

        self.write_header(&mut out, request);
        self.write_terraform_block(&mut out);
        self.write_provider(&mut out);
        self.write_variables(&mut out);
        self.write_locals(&mut out, request);
        write_network(&mut out);

        write_instance(&mut out, "primary", &instance_type, "primary", "primary");
        for i in 1..=request.num_replicas() {
            write_instance(
                &mut out,
                &format!("replica_{}", i),
                &instance_type,
                &format!("replica-{}", i),
                "replica",
            );
        }

        write_outputs(&mut out, request.num_replicas());

        check_structure(&out).map_err(IacError::Render)?;
        debug!(
            "Rendered Terraform for {} instance(s) of {}",
            request.node_count(),
            request.instance_type()
        );
        Ok(out)
    }

    fn write_header(&self, out: &mut String, request: &GenerationRequest) {
        let replicas = match request.num_replicas() {
            1 => "1 replica".to_string(),
            n => format!("{} replicas", n),
        };
        // Only validated values reach comments; they cannot contain newlines.
        let _ = writeln!(
            out,
            "# PostgreSQL {} cluster: 1 primary, {} ({})",
            request.postgres_version(),
            replicas,
            request.instance_type()
        );
        out.push_str("# Generated by pgforge. Do not edit by hand.\n\n");
    }

    fn write_terraform_block(&self, out: &mut String) {
        let _ = write!(
            out,
            r#"terraform {{
  required_version = ">= 1.3.0"

  required_providers {{
    aws = {{
      source  = "hashicorp/aws"
      version = {version}
    }}
  }}
}}

"#,
            version = quote(&self.settings.aws_provider_version)
        );
    }

    fn write_provider(&self, out: &mut String) {
        let _ = write!(
            out,
            r#"provider "aws" {{
  region = {region}
}}

"#,
            region = quote(&self.settings.region)
        );
    }

    fn write_variables(&self, out: &mut String) {
        let _ = write!(
            out,
            r#"variable "deployment_name" {{
  description = "Name prefix for every resource of this deployment"
  type        = string
  default     = {name}
}}

variable "ami_id" {{
  description = "AMI used for every PostgreSQL node"
  type        = string
  default     = {ami}
}}

variable "admin_cidr" {{
  description = "Address range allowed to reach the nodes over SSH"
  type        = string
  default     = {admin}
}}

"#,
            name = quote(&self.settings.deployment_name),
            ami = quote(&self.settings.ami_id),
            admin = quote(&self.settings.admin_cidr)
        );
    }

    fn write_locals(&self, out: &mut String, request: &GenerationRequest) {
        let _ = write!(
            out,
            r#"locals {{
  # Every node lives here; pg_hba.conf admits replication from it.
  cluster_cidr = {cidr}

  common_tags = {{
    Deployment      = var.deployment_name
    PostgresVersion = {version}
    ManagedBy       = "terraform"
    GeneratedBy     = "pgforge"
  }}
}}
"#,
            version = quote(request.postgres_version().as_str()),
            cidr = quote(&self.settings.network_cidr)
        );
    }
}

fn write_instance(out: &mut String, resource: &str, instance_type: &str, suffix: &str, role: &str) {
    let _ = write!(
        out,
        r#"
resource "aws_instance" "{resource}" {{
  ami           = var.ami_id
  instance_type = {instance_type}

  subnet_id              = aws_subnet.cluster.id
  vpc_security_group_ids = [aws_security_group.postgres.id]

  tags = merge(local.common_tags, {{
    Name = "${{var.deployment_name}}-{suffix}"
    Role = "{role}"
  }})
}}
"#
    );
}

/// VPC, public subnet and a security group admitting SSH from `admin_cidr`
/// and PostgreSQL from inside the cluster network.
fn write_network(out: &mut String) {
    out.push_str(
        r#"
resource "aws_vpc" "cluster" {
  cidr_block           = local.cluster_cidr
  enable_dns_hostnames = true

  tags = merge(local.common_tags, {
    Name = "${var.deployment_name}-vpc"
  })
}

resource "aws_internet_gateway" "cluster" {
  vpc_id = aws_vpc.cluster.id

  tags = merge(local.common_tags, {
    Name = "${var.deployment_name}-igw"
  })
}

resource "aws_subnet" "cluster" {
  vpc_id                  = aws_vpc.cluster.id
  cidr_block              = local.cluster_cidr
  map_public_ip_on_launch = true

  tags = merge(local.common_tags, {
    Name = "${var.deployment_name}-subnet"
  })
}

resource "aws_route_table" "cluster" {
  vpc_id = aws_vpc.cluster.id

  route {
    cidr_block = "0.0.0.0/0"
    gateway_id = aws_internet_gateway.cluster.id
  }

  tags = merge(local.common_tags, {
    Name = "${var.deployment_name}-routes"
  })
}

resource "aws_route_table_association" "cluster" {
  subnet_id      = aws_subnet.cluster.id
  route_table_id = aws_route_table.cluster.id
}

resource "aws_security_group" "postgres" {
  name_prefix = "${var.deployment_name}-"
  description = "PostgreSQL cluster nodes"
  vpc_id      = aws_vpc.cluster.id

  ingress {
    description = "SSH"
    from_port   = 22
    to_port     = 22
    protocol    = "tcp"
    cidr_blocks = [var.admin_cidr]
  }

  ingress {
    description = "PostgreSQL between cluster nodes"
    from_port   = 5432
    to_port     = 5432
    protocol    = "tcp"
    cidr_blocks = [local.cluster_cidr]
  }

  egress {
    from_port   = 0
    to_port     = 0
    protocol    = "-1"
    cidr_blocks = ["0.0.0.0/0"]
  }

  tags = local.common_tags
}
"#,
    );
}

fn write_outputs(out: &mut String, num_replicas: u32) {
    let replica_ips: Vec<String> = (1..=num_replicas)
        .map(|i| format!("aws_instance.replica_{}.private_ip", i))
        .collect();

    let _ = write!(
        out,
        r#"
output "primary_public_ip" {{
  description = "Public IP of the primary node"
  value       = aws_instance.primary.public_ip
}}

output "primary_private_ip" {{
  description = "Private IP of the primary node, the replication source"
  value       = aws_instance.primary.private_ip
}}

output "replica_private_ips" {{
  description = "Private IPs of the replica nodes"
  value       = [{ips}]
}}
"#,
        ips = replica_ips.join(", ")
    );
}
