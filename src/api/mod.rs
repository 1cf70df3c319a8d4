pub mod ft_manager;
