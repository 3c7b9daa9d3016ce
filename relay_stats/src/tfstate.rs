use serde::Deserialize;
use serde_json::Value;

const LAMBDA_FUNCTION: &str = "aws_lambda_function";

#[derive(Deserialize)]
struct Instance {
    attributes: Value,
}

#[derive(Deserialize)]
struct Resource {
    /// Absent for resources declared in the root module.
    #[serde(default)]
    module: String,
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default)]
    instances: Vec<Instance>,
}

/// The parts of a `terraform.tfstate` file this tool reads.
#[derive(Deserialize)]
pub struct TerraformState {
    #[serde(default)]
    resources: Vec<Resource>,
}

/// A deployed function and the Terraform module that declares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaFunction {
    pub module_name: String,
    pub function_name: String,
}

impl TerraformState {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Every `aws_lambda_function` instance, in state file order.
    pub fn lambda_functions(&self) -> Vec<LambdaFunction> {
        self.resources
            .iter()
            .filter(|r| r.resource_type == LAMBDA_FUNCTION)
            .flat_map(|r| {
                let module_name = r.module.strip_prefix("module.").unwrap_or(&r.module);
                r.instances
                    .iter()
                    .filter_map(|inst| inst.attributes.get("function_name")?.as_str())
                    .map(move |function_name| LambdaFunction {
                        module_name: module_name.to_string(),
                        function_name: function_name.to_string(),
                    })
            })
            .collect()
    }
}
