use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use shareplate_client::{
    DEFAULT_TOKEN_FILE, FeedPost, HttpClient, ImagePayload, NewDonation, SharePlateClient,
};

#[derive(Parser, Debug)]
#[clap(name = "shareplate", about = "Share leftover food and browse the feed")]
struct Cli {
    #[clap(short, long, env = "SHAREPLATE_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    #[clap(long, env = "SHAREPLATE_TOKEN_FILE", default_value = DEFAULT_TOKEN_FILE)]
    token_file: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    Register {
        #[clap(long)]
        username: String,
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
    },
    Login {
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
    },
    /// Forget the saved session
    Logout,
    Whoami,
    Feed,
    Post {
        #[clap(long)]
        food_name: String,
        /// Picture to upload first
        #[clap(long)]
        image: PathBuf,
    },
    Like {
        post_id: String,
    },
    Unlike {
        post_id: String,
    },
    Donate {
        #[clap(long)]
        food_name: String,
        #[clap(long)]
        servings: i64,
        #[clap(long, allow_hyphen_values = true)]
        latitude: f64,
        #[clap(long, allow_hyphen_values = true)]
        longitude: f64,
        #[clap(long)]
        image: Option<PathBuf>,
    },
    Donations,
    /// Save a post's picture to a file
    Image {
        image_id: String,
        #[clap(long)]
        output: PathBuf,
    },
}

fn read_image(path: &Path) -> anyhow::Result<ImagePayload> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let content_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        other => anyhow::bail!("unsupported image type: .{other}"),
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image");

    Ok(ImagePayload::from_bytes(file_name, content_type, &bytes))
}

fn print_post(post: &FeedPost) {
    let heart = if post.is_liked_by_current_user { "♥" } else { " " };
    println!(
        "{} [{}] {} by {} ({} likes, {})",
        heart, post.id, post.food_name, post.username, post.likes, post.timestamp
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let mut client = HttpClient::with_token_file(&args.server, args.token_file)?;

    match args.command {
        Command::Register {
            username,
            email,
            password,
        } => {
            let user = client.register(username, email, password).await?;
            println!("Registered and logged in as {}", user.username);
        }
        Command::Login { email, password } => {
            let user = client.login(email, password).await?;
            println!("Logged in as {}", user.username);
        }
        Command::Logout => {
            client.clear_token()?;
            println!("Logged out");
        }
        Command::Whoami => {
            let user = client.me().await?;
            println!("{} <{}> (id {})", user.username, user.email, user.id);
        }
        Command::Feed => {
            let posts = client.list_feed().await?;
            println!("Feed ({})", posts.len());
            for post in &posts {
                print_post(post);
            }
        }
        Command::Post { food_name, image } => {
            let image_id = client.upload_image(read_image(&image)?).await?;
            let post = client.create_post(food_name, image_id).await?;
            println!("Post created! ID: {}", post.id);
        }
        Command::Like { post_id } => {
            let post = client.like(&post_id).await?;
            print_post(&post);
        }
        Command::Unlike { post_id } => {
            let post = client.unlike(&post_id).await?;
            print_post(&post);
        }
        Command::Donate {
            food_name,
            servings,
            latitude,
            longitude,
            image,
        } => {
            let image = image.as_deref().map(read_image).transpose()?;
            let receipt = client
                .donate(NewDonation {
                    food_name,
                    serving_count: servings,
                    latitude,
                    longitude,
                    image,
                })
                .await?;
            println!("Donation recorded! ID: {}", receipt.donation.id);
            if let Some(post) = receipt.post {
                println!("Shared on the feed as post {}", post.id);
            }
        }
        Command::Donations => {
            let donations = client.list_donations().await?;
            println!("Donations ({})", donations.len());
            for donation in donations {
                println!(
                    "- [{}] {} x{} at ({:.5}, {:.5}) on {}",
                    donation.id,
                    donation.food_name,
                    donation.serving_count,
                    donation.latitude,
                    donation.longitude,
                    donation.created_at
                );
            }
        }
        Command::Image { image_id, output } => {
            let bytes = client.download_image(&image_id).await?;
            std::fs::write(&output, &bytes)
                .with_context(|| format!("cannot write {}", output.display()))?;
            println!("Saved {} bytes to {}", bytes.len(), output.display());
        }
    }

    Ok(())
}
