// Struct representing the request body for registering a user
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SignupSchema {
    pub email: String,
    pub password: String,
}

// Struct representing the request body for signing in
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct LoginSchema {
    pub email: String,
    pub password: String,
}

// Struct representing the request body for creating a new Todo
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct CreateTodoSchema {
    pub title: String,
}

// Struct representing the request body for partially updating a Todo
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct UpdateTodoSchema {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

// Struct representing the request body for toggling a Todo
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ToggleTodoSchema {
    pub completed: bool,
}
