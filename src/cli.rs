use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "restaurant_recommender")]
#[command(version, about = "Recommends restaurants from a user's visit history")]
pub struct Args {
    /// User whose history drives the recommendations
    pub user_id: String,
    /// Restrict recommendations to a live search around this point
    #[arg(requires = "longitude", allow_negative_numbers = true)]
    pub latitude: Option<f64>,
    #[arg(allow_negative_numbers = true)]
    pub longitude: Option<f64>,
}

impl Args {
    pub fn location(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}
